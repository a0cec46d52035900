use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::fanout::FanOutExecutor;

/// Tunables of the job engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Capacity of the notification channel. Observers lagging further
    /// behind lose the oldest events.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Maximum remote calls in flight per fan-out. Unbounded when unset.
    #[serde(default)]
    pub fanout_concurrency: Option<usize>,
    /// Kill time applied to cancelable jobs submitted without a deadline.
    #[serde(default)]
    pub default_kill_after_secs: Option<u64>,
    /// Maximum number of pages a log download reads.
    #[serde(default = "default_log_page_limit")]
    pub log_page_limit: usize,
}

fn default_event_capacity() -> usize {
    256
}

fn default_log_page_limit() -> usize {
    10_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            fanout_concurrency: None,
            default_kill_after_secs: None,
            log_page_limit: default_log_page_limit(),
        }
    }
}

impl EngineConfig {
    pub fn fanout(&self) -> FanOutExecutor {
        match self.fanout_concurrency.and_then(NonZeroUsize::new) {
            Some(limit) => FanOutExecutor::with_limit(limit),
            None => FanOutExecutor::unbounded(),
        }
    }

    pub fn default_kill_after(&self) -> Option<chrono::Duration> {
        self.default_kill_after_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::Duration::try_seconds)
    }
}
