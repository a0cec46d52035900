//! Kind-specific job execution.
//!
//! Each [`JobKind`] has exactly one [`Worker`]. Workers receive the job and
//! a [`JobContext`] carrying the remote store, the job's cancellation
//! signal and a handle to report progress. They return a [`WorkerOutput`]:
//! expected remote failures are encoded in the result, and `Err` is
//! reserved for defects.

pub mod copy;
pub mod delete;
pub mod download;
pub mod result;
pub mod table;
pub mod well;

use std::sync::Arc;

use async_trait::async_trait;

use crate::cancel::CancelSignal;
use crate::error::WorkerError;
use crate::fanout::FanOutExecutor;
use crate::hub::RefreshNotification;
use crate::job::{Job, JobKind};
use crate::record::{JobRecord, JobReport};
use crate::remote::RemoteStore;

pub use copy::CopyObjectsWorker;
pub use delete::{
    DeleteComponentsWorker, DeleteObjectsWorker, DeleteWellWorker, DeleteWellboreWorker,
};
pub use download::DownloadLogWorker;
pub use result::WorkerResult;
pub use table::{WorkerTable, WorkerTableBuilder};
pub use well::{BatchModifyWellsWorker, CreateWellWorker, ModifyWellWorker};

/// What a worker hands back to the dispatcher.
#[derive(Debug, Clone)]
pub struct WorkerOutput {
    pub result: WorkerResult,
    pub refresh: Option<RefreshNotification>,
}

impl WorkerOutput {
    pub fn new(result: WorkerResult) -> Self {
        Self {
            result,
            refresh: None,
        }
    }

    pub fn with_refresh(mut self, refresh: Option<RefreshNotification>) -> Self {
        self.refresh = refresh;
        self
    }
}

#[async_trait]
pub trait Worker: Send + Sync {
    /// The job kind this worker handles.
    fn kind(&self) -> JobKind;

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError>;
}

/// Everything a worker may touch while running one job.
pub struct JobContext {
    record: Arc<JobRecord>,
    store: Arc<dyn RemoteStore>,
    signal: CancelSignal,
    fanout: FanOutExecutor,
    log_page_limit: usize,
}

impl JobContext {
    pub fn new(
        record: Arc<JobRecord>,
        store: Arc<dyn RemoteStore>,
        fanout: FanOutExecutor,
        log_page_limit: usize,
    ) -> Self {
        let signal = record.cancellation().signal();
        Self {
            record,
            store,
            signal,
            fanout,
            log_page_limit,
        }
    }

    pub fn job_id(&self) -> &str {
        self.record.id()
    }

    pub fn store(&self) -> &dyn RemoteStore {
        self.store.as_ref()
    }

    pub fn server_url(&self) -> &str {
        self.store.server_url()
    }

    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    pub fn fanout(&self) -> FanOutExecutor {
        self.fanout
    }

    pub fn log_page_limit(&self) -> usize {
        self.log_page_limit
    }

    pub fn report_progress(&self, progress: f64) {
        self.record.set_progress(progress);
    }

    pub fn attach_report(&self, report: JobReport) {
        self.record.attach_report(report);
    }
}

/// Error for a worker handed a job of another kind.
pub(crate) fn unexpected_payload(expected: JobKind, job: &Job) -> WorkerError {
    WorkerError::UnexpectedPayload {
        expected,
        found: job.kind(),
    }
}
