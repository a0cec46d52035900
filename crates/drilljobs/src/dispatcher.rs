//! Submission, execution and cancellation of jobs.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinError;
use tracing::{info_span, Instrument};

use crate::cancel::CancelReason;
use crate::config::loader::{load_config, validate_config};
use crate::config::EngineConfig;
use crate::error::{CancelError, ConfigError, DrilljobsError, ValidationError};
use crate::hub::{JobCompletedEvent, NotificationHub};
use crate::job::Job;
use crate::record::{JobRecord, JobSnapshot, JobStatus};
use crate::registry::JobRegistry;
use crate::remote::RemoteStore;
use crate::worker::{JobContext, Worker, WorkerOutput, WorkerResult, WorkerTable};

/// Reason shown for jobs whose worker hit a defect. Details go to the log only.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred while running the job";

/// Accepts jobs and runs each one on its own tokio task.
///
/// Submission validates the payload synchronously and returns the job id
/// before any remote work starts. Everything after that is observable
/// through the [`JobRegistry`] and the [`NotificationHub`].
pub struct JobDispatcher {
    store: Arc<dyn RemoteStore>,
    workers: Arc<WorkerTable>,
    registry: Arc<JobRegistry>,
    hub: NotificationHub,
    config: EngineConfig,
}

impl JobDispatcher {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        workers: WorkerTable,
        registry: Arc<JobRegistry>,
        hub: NotificationHub,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            workers: Arc::new(workers),
            registry,
            hub,
            config,
        }
    }

    /// Dispatcher with the standard workers, a fresh registry and a hub
    /// sized from `config`.
    pub fn from_config(
        store: Arc<dyn RemoteStore>,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        validate_config(&config)?;
        let hub = NotificationHub::new(config.event_capacity);
        Ok(Self::new(
            store,
            WorkerTable::standard()?,
            Arc::new(JobRegistry::new()),
            hub,
            config,
        ))
    }

    /// Loads the engine config from a JSON file and builds a dispatcher.
    pub fn from_config_file<P: AsRef<Path>>(
        store: Arc<dyn RemoteStore>,
        path: P,
    ) -> Result<Self, DrilljobsError> {
        let config = load_config(path)?;
        Ok(Self::from_config(store, config)?)
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Submits a job and returns its id.
    ///
    /// Cancelable kinds receive the configured default kill time. Must be
    /// called from within a tokio runtime.
    pub fn submit(&self, job: Job) -> Result<String, ValidationError> {
        let kill_at = if job.is_cancelable() {
            self.config
                .default_kill_after()
                .and_then(|after| Utc::now().checked_add_signed(after))
        } else {
            None
        };
        self.start(job, kill_at)
    }

    /// Submits a cancelable job that is cancelled automatically at `kill_at`.
    pub fn submit_with_deadline(
        &self,
        job: Job,
        kill_at: DateTime<Utc>,
    ) -> Result<String, ValidationError> {
        if !job.is_cancelable() {
            return Err(ValidationError::DeadlineNotSupported { kind: job.kind() });
        }
        self.start(job, Some(kill_at))
    }

    fn start(&self, job: Job, kill_at: Option<DateTime<Utc>>) -> Result<String, ValidationError> {
        if let Err(e) = job.validate() {
            log::warn!("Rejected {} job: {}", job.kind(), e);
            return Err(e);
        }

        let worker = self.workers.worker_for(job.kind());
        let record = Arc::new(JobRecord::new(job, self.store.server_url(), kill_at));
        let job_id = record.id().to_string();

        record.cancellation().arm(&job_id);
        self.registry.insert(Arc::clone(&record));

        log::info!(
            "Submitted job {} ({}): {}",
            job_id,
            record.kind(),
            record.info().description
        );

        let ctx = JobContext::new(
            Arc::clone(&record),
            Arc::clone(&self.store),
            self.config.fanout(),
            self.config.log_page_limit,
        );
        tokio::spawn(run_job(record, worker, ctx, self.hub.clone()));

        Ok(job_id)
    }

    pub fn status(&self, job_id: &str) -> Option<JobSnapshot> {
        self.registry.snapshot(job_id)
    }

    /// Waits for a job to reach a terminal state.
    pub async fn wait(&self, job_id: &str) -> Option<JobSnapshot> {
        let record = self.registry.get(job_id)?;
        Some(record.wait_finished().await)
    }

    /// Requests cooperative cancellation of a running job.
    pub fn cancel(&self, job_id: &str) -> Result<(), CancelError> {
        let record = self
            .registry
            .get(job_id)
            .ok_or_else(|| CancelError::NotFound(job_id.to_string()))?;

        if !record.is_cancelable() {
            return Err(CancelError::NotCancelable {
                id: job_id.to_string(),
                kind: record.kind(),
            });
        }
        if record.status().is_terminal() {
            return Err(CancelError::AlreadyFinished(job_id.to_string()));
        }

        if record.cancellation().cancel(CancelReason::Operator) {
            log::info!("Cancellation requested for job {}", job_id);
        }
        Ok(())
    }
}

/// Runs one job to its terminal state.
///
/// The worker runs on a nested task so a panic surfaces as a `JoinError`
/// here instead of unwinding through the dispatcher.
async fn run_job(
    record: Arc<JobRecord>,
    worker: Arc<dyn Worker>,
    ctx: JobContext,
    hub: NotificationHub,
) {
    let span = info_span!("job", id = %record.id(), kind = %record.kind());

    async move {
        let job_record = Arc::clone(&record);
        let handle = tokio::spawn(
            async move { worker.execute(job_record.job(), &ctx).await }.in_current_span(),
        );

        let outcome = match handle.await {
            Ok(Ok(output)) => Some(output),
            Ok(Err(e)) => {
                log::error!(
                    "Worker error in job {} ({}, {}): {}",
                    record.id(),
                    record.kind(),
                    record.info().description,
                    e
                );
                None
            }
            Err(e) => {
                log::error!(
                    "Worker task for job {} ({}, {}) {}",
                    record.id(),
                    record.kind(),
                    record.info().description,
                    describe_join_error(e)
                );
                None
            }
        };

        finish(&record, outcome, &hub);
    }
    .instrument(span)
    .await
}

fn finish(record: &JobRecord, outcome: Option<WorkerOutput>, hub: &NotificationHub) {
    let (status, result, refresh) = match outcome {
        Some(output) => {
            let status = if record.cancellation().is_cancelled() {
                JobStatus::Cancelled
            } else if output.result.success {
                JobStatus::Finished
            } else {
                JobStatus::Failed
            };
            (status, output.result, output.refresh)
        }
        None => (
            JobStatus::Failed,
            WorkerResult::failure(
                format!("{} did not complete", record.info().description),
                UNEXPECTED_ERROR,
            ),
            None,
        ),
    };

    if !record.finish_with(status, &result) {
        return;
    }

    match status {
        JobStatus::Finished => log::info!("Job {} finished: {}", record.id(), result.message),
        JobStatus::Cancelled => log::info!(
            "Job {} cancelled ({}): {}",
            record.id(),
            record
                .cancellation()
                .reason()
                .unwrap_or(CancelReason::Operator),
            result.message
        ),
        _ => log::warn!(
            "Job {} failed: {} ({})",
            record.id(),
            result.message,
            result.reason.as_deref().unwrap_or("no reason given")
        ),
    }

    if let Some(refresh) = refresh {
        hub.publish_refresh(refresh);
    }
    hub.publish_completed(JobCompletedEvent {
        job_id: record.id().to_string(),
        kind: record.kind(),
        description: record.info().description.clone(),
        server_url: record.server_url().to_string(),
        status,
        result,
        timestamp: Utc::now(),
    });
}

fn describe_join_error(e: JoinError) -> String {
    if e.is_panic() {
        format!("panicked: {}", panic_message(e.into_panic()))
    } else {
        "was aborted".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
