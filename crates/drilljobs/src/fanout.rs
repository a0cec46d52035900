//! Concurrent application of one remote operation to many targets.
//!
//! Every target resolves to a [`BatchOutcome`]; a failing or slow target
//! never aborts or delays its siblings. The batch is joined before any
//! outcome is interpreted, and aggregate messages are built in submission
//! order so they do not depend on which call happened to finish first.

use std::future::Future;
use std::num::NonZeroUsize;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::cancel::CancelSignal;
use crate::record::{JobReport, ReportOutcome};
use crate::remote::{ObjectRef, RemoteFailure, StoreObject};
use crate::worker::WorkerResult;

/// Something a batch can address.
pub trait FanOutTarget {
    fn target_id(&self) -> &str;
}

impl FanOutTarget for ObjectRef {
    fn target_id(&self) -> &str {
        &self.uid
    }
}

impl FanOutTarget for StoreObject {
    fn target_id(&self) -> &str {
        &self.reference.uid
    }
}

impl FanOutTarget for String {
    fn target_id(&self) -> &str {
        self
    }
}

/// Resolution of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    Succeeded,
    Failed(String),
    /// Not dispatched because cancellation was observed first.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Position of the target in the submitted list.
    pub index: usize,
    pub target_id: String,
    pub status: TargetStatus,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, TargetStatus::Succeeded)
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            TargetStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn was_dispatched(&self) -> bool {
        !matches!(self.status, TargetStatus::Skipped)
    }
}

/// Wording used when turning a batch into a result message.
#[derive(Debug, Clone, Copy)]
pub struct BatchWording<'a> {
    /// e.g. "delete"
    pub verb: &'a str,
    /// e.g. "Deleted"
    pub past: &'a str,
    /// e.g. "logs"
    pub noun: &'a str,
}

/// All outcomes of one fan-out, in submission order.
#[derive(Debug, Clone)]
pub struct Batch {
    outcomes: Vec<BatchOutcome>,
    completion_order: Vec<usize>,
}

impl Batch {
    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    /// Target indices in the order their calls resolved.
    pub fn completion_order(&self) -> &[usize] {
        &self.completion_order
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(BatchOutcome::succeeded)
    }

    pub fn any_succeeded(&self) -> bool {
        self.outcomes.iter().any(BatchOutcome::succeeded)
    }

    pub fn succeeded_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.succeeded())
            .map(|o| o.target_id.as_str())
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.reason().is_some()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.was_dispatched()).count()
    }

    /// First failure by submission order.
    pub fn first_failure(&self) -> Option<&BatchOutcome> {
        self.outcomes.iter().find(|o| o.reason().is_some())
    }

    /// Aggregates the batch into a single worker result.
    pub fn to_result(&self, wording: BatchWording<'_>) -> WorkerResult {
        let BatchWording { verb, past, noun } = wording;
        let succeeded = self.succeeded_ids().join(", ");

        let mut message = if self.all_succeeded() {
            format!("{past} {noun}: {succeeded}")
        } else if self.any_succeeded() {
            format!("Failed to {verb} all {noun}. {past} {noun}: {succeeded}")
        } else {
            format!("Failed to {verb} {noun}")
        };

        let skipped = self.skipped_count();
        if skipped > 0 {
            message.push_str(&format!(" ({skipped} of {} not attempted)", self.len()));
        }

        let reason = self
            .first_failure()
            .and_then(|o| o.reason())
            .map(|reason| reason.to_string());

        WorkerResult {
            success: self.all_succeeded(),
            message,
            reason,
            affected: None,
        }
    }

    /// One report row per target, in submission order.
    pub fn to_report(&self, title: &str, wording: BatchWording<'_>) -> JobReport {
        let mut report = JobReport::new(
            title,
            format!(
                "{} {} of {} {}",
                wording.past,
                self.success_count(),
                self.len(),
                wording.noun
            ),
        );
        for outcome in &self.outcomes {
            let (status, detail) = match &outcome.status {
                TargetStatus::Succeeded => (ReportOutcome::Succeeded, None),
                TargetStatus::Failed(reason) => (ReportOutcome::Failed, Some(reason.clone())),
                TargetStatus::Skipped => (
                    ReportOutcome::Skipped,
                    Some("Not attempted: job was cancelled".to_string()),
                ),
            };
            report.push_row(outcome.target_id.clone(), status, detail);
        }
        report
    }
}

/// Runs one operation against many targets concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanOutExecutor {
    limit: Option<NonZeroUsize>,
}

impl FanOutExecutor {
    /// Dispatches every target at once.
    pub fn unbounded() -> Self {
        Self { limit: None }
    }

    /// Keeps at most `limit` calls in flight.
    pub fn with_limit(limit: NonZeroUsize) -> Self {
        Self { limit: Some(limit) }
    }

    pub fn limit(&self) -> Option<NonZeroUsize> {
        self.limit
    }

    /// Applies `op` to every target and waits for all of them.
    ///
    /// The signal is checked immediately before each call is dispatched;
    /// once it is raised no further call starts, while calls already in
    /// flight are allowed to finish. `on_progress` receives the resolved
    /// fraction after every outcome.
    pub async fn run<'a, T, F, Fut>(
        &self,
        targets: &'a [T],
        signal: &CancelSignal,
        mut on_progress: impl FnMut(f64),
        op: F,
    ) -> Batch
    where
        T: FanOutTarget,
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = Result<(), RemoteFailure>>,
    {
        let total = targets.len();
        let span = info_span!("fanout", targets = total);

        async move {
            let in_flight = self
                .limit
                .map(NonZeroUsize::get)
                .unwrap_or(total)
                .max(1);

            // Futures are built up front so the stream holds no closure over
            // borrowed targets; each one checks the signal on first poll.
            let op = &op;
            let calls: Vec<_> = targets
                .iter()
                .enumerate()
                .map(|(index, target)| {
                    let signal = signal.clone();
                    async move {
                        let target_id = target.target_id().to_string();
                        if signal.is_cancelled() {
                            return BatchOutcome {
                                index,
                                target_id,
                                status: TargetStatus::Skipped,
                            };
                        }
                        let status = match op(target).await {
                            Ok(()) => TargetStatus::Succeeded,
                            Err(failure) => TargetStatus::Failed(failure.reason),
                        };
                        BatchOutcome {
                            index,
                            target_id,
                            status,
                        }
                    }
                })
                .collect();
            let mut pending = stream::iter(calls).buffer_unordered(in_flight);

            let mut outcomes = Vec::with_capacity(total);
            let mut completion_order = Vec::with_capacity(total);
            while let Some(outcome) = pending.next().await {
                match &outcome.status {
                    TargetStatus::Succeeded => info!("Target {} succeeded", outcome.target_id),
                    TargetStatus::Failed(reason) => {
                        warn!("Target {} failed: {}", outcome.target_id, reason)
                    }
                    TargetStatus::Skipped => {
                        debug!("Target {} skipped after cancellation", outcome.target_id)
                    }
                }
                completion_order.push(outcome.index);
                outcomes.push(outcome);
                on_progress(outcomes.len() as f64 / total as f64);
            }

            outcomes.sort_by_key(|o| o.index);
            let batch = Batch {
                outcomes,
                completion_order,
            };
            info!(
                "Batch done: {} succeeded, {} failed, {} skipped of {}",
                batch.success_count(),
                batch.failure_count(),
                batch.skipped_count(),
                total
            );
            batch
        }
        .instrument(span)
        .await
    }
}
