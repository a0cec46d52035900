//! Per-job cooperative cancellation.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Why a job was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Operator,
    Deadline,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Operator => write!(f, "cancelled by operator"),
            CancelReason::Deadline => write!(f, "kill time reached"),
        }
    }
}

/// Read side of a job's cancellation, handed to every remote-call site.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    /// A signal that is never raised.
    pub fn never() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Owns the cancellation state of one job for its whole lifetime.
pub struct CancellationController {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
    kill_at: Option<DateTime<Utc>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl CancellationController {
    pub fn new(kill_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
            kill_at,
            timer: Mutex::new(None),
        }
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            token: self.token.clone(),
        }
    }

    pub fn kill_at(&self) -> Option<DateTime<Utc>> {
        self.kill_at
    }

    /// Requests cancellation. Returns false if it was already requested.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    /// Starts the kill-time timer, if the job has one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, job_id: &str) {
        let Some(kill_at) = self.kill_at else {
            return;
        };

        let delay = (kill_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let token = self.token.clone();
        let reason = Arc::clone(&self.reason);
        let job_id = job_id.to_string();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if reason.set(CancelReason::Deadline).is_ok() {
                        log::warn!("Job {} reached its kill time, requesting cancellation", job_id);
                    }
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        });

        let mut guard = match self.timer.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Cancellation timer lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }
    }

    /// Stops the kill-time timer. Called once the job is terminal.
    pub fn release(&self) {
        let handle = match self.timer.lock() {
            Ok(mut g) => g.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl fmt::Debug for CancellationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationController")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .field("kill_at", &self.kill_at)
            .finish()
    }
}

impl Drop for CancellationController {
    fn drop(&mut self) {
        self.release();
    }
}
