//! Job records and the status state machine.

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::cancel::{CancelReason, CancellationController};
use crate::job::{Job, JobInfo, JobKind};
use crate::worker::WorkerResult;

/// Lifecycle status of a job.
///
/// `Started` is the only non-terminal state. The three terminal states
/// have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Started,
    Finished,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Started)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Started => write!(f, "Started"),
            JobStatus::Finished => write!(f, "Finished"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Outcome tag of one report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    Succeeded,
    Failed,
    Skipped,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub target: String,
    pub outcome: ReportOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Detailed report a worker may attach to its job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<ReportRow>,
    /// Raw payload produced by the job, e.g. downloaded log data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl JobReport {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            rows: vec![],
            attachment: None,
        }
    }

    pub fn push_row(
        &mut self,
        target: impl Into<String>,
        outcome: ReportOutcome,
        detail: Option<String>,
    ) {
        self.rows.push(ReportRow {
            target: target.into(),
            outcome,
            detail,
        });
    }
}

#[derive(Debug)]
struct RecordState {
    status: JobStatus,
    progress: f64,
    ended_at: Option<DateTime<Utc>>,
    message: Option<String>,
    failure_reason: Option<String>,
    report: Option<JobReport>,
}

/// Tracking entity for one submitted job.
///
/// Progress and reports are written by the executing worker, the terminal
/// transition by the dispatcher. Reads are safe from any thread.
pub struct JobRecord {
    id: String,
    job: Job,
    info: JobInfo,
    server_url: String,
    submitted_at: DateTime<Utc>,
    cancellation: CancellationController,
    state: RwLock<RecordState>,
    status_tx: watch::Sender<JobStatus>,
}

impl JobRecord {
    /// Creates a record in the `Started` state with zero progress.
    pub fn new(job: Job, server_url: impl Into<String>, kill_at: Option<DateTime<Utc>>) -> Self {
        let info = job.info();
        let (status_tx, _) = watch::channel(JobStatus::Started);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job,
            info,
            server_url: server_url.into(),
            submitted_at: Utc::now(),
            cancellation: CancellationController::new(kill_at),
            state: RwLock::new(RecordState {
                status: JobStatus::Started,
                progress: 0.0,
                ended_at: None,
                message: None,
                failure_reason: None,
                report: None,
            }),
            status_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        self.job.kind()
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn info(&self) -> &JobInfo {
        &self.info
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn is_cancelable(&self) -> bool {
        self.job.is_cancelable()
    }

    pub fn cancellation(&self) -> &CancellationController {
        &self.cancellation
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RecordState> {
        match self.state.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job record {} lock was poisoned, recovering", self.id);
                poisoned.into_inner()
            }
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RecordState> {
        match self.state.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job record {} lock was poisoned, recovering", self.id);
                poisoned.into_inner()
            }
        }
    }

    pub fn status(&self) -> JobStatus {
        self.read_state().status
    }

    pub fn progress(&self) -> f64 {
        self.read_state().progress
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.read_state().ended_at
    }

    /// Updates progress while the job is running.
    ///
    /// Returns false (and changes nothing) once the job is terminal.
    /// Values are clamped below 1.0, which only a terminal state reaches.
    pub fn set_progress(&self, progress: f64) -> bool {
        let mut state = self.write_state();
        if state.status.is_terminal() {
            return false;
        }
        let progress = if progress.is_nan() { 0.0 } else { progress };
        state.progress = progress.clamp(0.0, 0.99);
        true
    }

    /// Attaches a report while the job is running.
    pub fn attach_report(&self, report: JobReport) -> bool {
        let mut state = self.write_state();
        if state.status.is_terminal() {
            return false;
        }
        state.report = Some(report);
        true
    }

    /// Moves the job into a terminal state.
    pub fn transition(&self, status: JobStatus) -> bool {
        self.enter_terminal(status, None, None)
    }

    /// Moves the job into a terminal state, keeping the worker's message
    /// and failure reason.
    pub fn finish_with(&self, status: JobStatus, result: &WorkerResult) -> bool {
        self.enter_terminal(
            status,
            Some(result.message.clone()),
            result.reason.clone(),
        )
    }

    fn enter_terminal(
        &self,
        status: JobStatus,
        message: Option<String>,
        reason: Option<String>,
    ) -> bool {
        if !status.is_terminal() {
            return false;
        }
        {
            let mut state = self.write_state();
            if state.status.is_terminal() {
                log::warn!(
                    "Ignoring transition of job {} to {}: already {}",
                    self.id,
                    status,
                    state.status
                );
                return false;
            }
            state.status = status;
            state.progress = 1.0;
            state.ended_at = Some(Utc::now());
            state.message = message;
            state.failure_reason = reason;
        }
        self.cancellation.release();
        self.status_tx.send_replace(status);
        true
    }

    /// Waits until the job reaches a terminal state.
    pub async fn wait_finished(&self) -> JobSnapshot {
        let mut rx = self.status_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail while borrowed.
        let _ = rx.wait_for(|status| status.is_terminal()).await;
        self.snapshot()
    }

    /// Point-in-time copy of the record.
    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.read_state();
        JobSnapshot {
            job_id: self.id.clone(),
            kind: self.kind(),
            description: self.info.description.clone(),
            well_name: self.info.well_name.clone(),
            wellbore_name: self.info.wellbore_name.clone(),
            object_name: self.info.object_name.clone(),
            server_url: self.server_url.clone(),
            status: state.status,
            progress: state.progress,
            submitted_at: self.submitted_at,
            ended_at: state.ended_at,
            is_cancelable: self.is_cancelable(),
            cancel_reason: self.cancellation.reason(),
            kill_at: self.cancellation.kill_at(),
            message: state.message.clone(),
            failure_reason: state.failure_reason.clone(),
            report: state.report.clone(),
        }
    }
}

impl fmt::Debug for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRecord")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("server_url", &self.server_url)
            .field("state", &*self.read_state())
            .finish()
    }
}

/// Serializable copy of a job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: String,
    pub kind: JobKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub well_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wellbore_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    pub server_url: String,
    pub status: JobStatus,
    pub progress: f64,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub is_cancelable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<CancelReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kill_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<JobReport>,
}

impl JobSnapshot {
    /// Returns true if this job is finished (any terminal state).
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock run time, once the job is terminal.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.submitted_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::DeleteWellJob;
    use crate::remote::ObjectRef;

    fn record() -> JobRecord {
        JobRecord::new(
            Job::DeleteWell(DeleteWellJob {
                well: ObjectRef::well("W-1").named("Troll A-1"),
            }),
            "https://store.example/witsml",
            None,
        )
    }

    fn assert_invariant(snapshot: &JobSnapshot) {
        let terminal = snapshot.status.is_terminal();
        assert_eq!(terminal, snapshot.ended_at.is_some(), "{snapshot:?}");
        assert_eq!(terminal, snapshot.progress == 1.0, "{snapshot:?}");
    }

    #[test]
    fn test_new_record_is_started() {
        let record = record();
        let snapshot = record.snapshot();
        assert_eq!(snapshot.status, JobStatus::Started);
        assert_eq!(snapshot.progress, 0.0);
        assert!(snapshot.ended_at.is_none());
        assert_eq!(snapshot.description, "Delete well 'Troll A-1'");
        assert!(!snapshot.is_cancelable);
        assert_invariant(&snapshot);
    }

    #[test]
    fn test_progress_is_clamped_below_complete() {
        let record = record();
        assert!(record.set_progress(0.5));
        assert_eq!(record.progress(), 0.5);

        record.set_progress(1.0);
        assert!(record.progress() < 1.0);
        record.set_progress(-3.0);
        assert_eq!(record.progress(), 0.0);
        record.set_progress(f64::NAN);
        assert_eq!(record.progress(), 0.0);
        assert_invariant(&record.snapshot());
    }

    #[test]
    fn test_terminal_sets_end_time_and_full_progress() {
        for status in [JobStatus::Finished, JobStatus::Failed, JobStatus::Cancelled] {
            let record = record();
            record.set_progress(0.25);
            assert!(record.transition(status));

            let snapshot = record.snapshot();
            assert_eq!(snapshot.status, status);
            assert_eq!(snapshot.progress, 1.0);
            assert!(snapshot.ended_at.is_some());
            assert!(snapshot.duration().is_some());
            assert_invariant(&snapshot);
        }
    }

    #[test]
    fn test_no_transition_out_of_terminal() {
        let record = record();
        assert!(record.transition(JobStatus::Failed));
        let ended = record.ended_at();

        assert!(!record.transition(JobStatus::Finished));
        assert!(!record.transition(JobStatus::Cancelled));
        assert!(!record.set_progress(0.3));
        assert!(!record.attach_report(JobReport::new("late", "late")));

        assert_eq!(record.status(), JobStatus::Failed);
        assert_eq!(record.ended_at(), ended);
        assert_eq!(record.progress(), 1.0);
    }

    #[test]
    fn test_started_is_not_a_transition_target() {
        let record = record();
        assert!(!record.transition(JobStatus::Started));
        assert_eq!(record.status(), JobStatus::Started);
        assert_invariant(&record.snapshot());
    }

    #[test]
    fn test_finish_with_keeps_message_and_reason() {
        let record = record();
        let result = WorkerResult::failure("Failed to delete well", "Server busy");
        assert!(record.finish_with(JobStatus::Failed, &result));

        let snapshot = record.snapshot();
        assert_eq!(snapshot.message.as_deref(), Some("Failed to delete well"));
        assert_eq!(snapshot.failure_reason.as_deref(), Some("Server busy"));
    }

    #[test]
    fn test_report_attached_while_running() {
        let record = record();
        let mut report = JobReport::new("Delete", "1 of 1 deleted");
        report.push_row("W-1", ReportOutcome::Succeeded, None);
        assert!(record.attach_report(report.clone()));
        assert_eq!(record.snapshot().report, Some(report));
    }

    #[tokio::test]
    async fn test_wait_finished_returns_terminal_snapshot() {
        let record = std::sync::Arc::new(record());
        let waiter = {
            let record = std::sync::Arc::clone(&record);
            tokio::spawn(async move { record.wait_finished().await })
        };
        record.transition(JobStatus::Finished);

        let snapshot = waiter.await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Finished);
        assert_invariant(&snapshot);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let record = record();
        let json = serde_json::to_value(record.snapshot()).unwrap();
        assert_eq!(json["status"], "started");
        assert_eq!(json["kind"], "DeleteWell");
        assert_eq!(json["isCancelable"], false);
        assert!(json.get("endedAt").is_none());
    }
}
