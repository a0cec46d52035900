//! Background job engine for bulk operations against a remote
//! drilling-data store.
//!
//! A [`JobDispatcher`] validates submitted [`Job`]s, tracks each one as a
//! [`JobRecord`] in a [`JobRegistry`] and runs it on its own tokio task
//! through the [`Worker`] registered for its [`JobKind`]. Bulk kinds use
//! the [`FanOutExecutor`] so one failing target never aborts its siblings.
//! Completion and data-refresh events go out on the [`NotificationHub`].

pub mod cancel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod hub;
pub mod job;
pub mod record;
pub mod registry;
pub mod remote;
pub mod telemetry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod worker;

pub use cancel::{CancelReason, CancelSignal, CancellationController};
pub use config::{load_config, load_config_from_str, EngineConfig};
pub use dispatcher::{JobDispatcher, UNEXPECTED_ERROR};
pub use error::{
    CancelError, ConfigError, DrilljobsError, Result, TelemetryError, ValidationError, WorkerError,
};
pub use fanout::{Batch, BatchOutcome, FanOutExecutor, TargetStatus};
pub use hub::{
    ChangeKind, HubEvent, JobCompletedEvent, NotificationHub, RefreshNotification,
    ServerSubscription,
};
pub use job::{Job, JobInfo, JobKind};
pub use record::{JobRecord, JobReport, JobSnapshot, JobStatus};
pub use registry::{JobListResponse, JobQueryParams, JobRegistry};
pub use remote::{ComponentType, EntityType, ObjectRef, RemoteFailure, RemoteStore, StoreObject};
pub use telemetry::init_logging;
pub use worker::{JobContext, Worker, WorkerOutput, WorkerResult, WorkerTable};
