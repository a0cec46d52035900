use std::path::PathBuf;
use thiserror::Error;

use crate::job::JobKind;
use crate::remote::EntityType;

/// Any error the engine surfaces to an embedding host.
#[derive(Error, Debug)]
pub enum DrilljobsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid job: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cancellation rejected: {0}")]
    Cancel(#[from] CancelError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("No worker registered for job kind '{0}'")]
    UnmappedJobKind(JobKind),
}

/// Structural problems with a submitted job payload.
///
/// Raised synchronously on submission, before any job record exists.
/// None of these are worth retrying without changing the payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{kind} requires at least one target")]
    EmptyTargets { kind: JobKind },

    #[error("{kind}: {field} is required")]
    MissingField {
        kind: JobKind,
        field: &'static str,
    },

    #[error("{kind}: expected a {expected} reference, got {found}")]
    WrongEntityType {
        kind: JobKind,
        expected: EntityType,
        found: EntityType,
    },

    #[error("{kind}: {entity_type} cannot be handled as a child object")]
    NotAChildObject {
        kind: JobKind,
        entity_type: EntityType,
    },

    #[error("{kind}: all targets must have the same object type")]
    MixedEntityTypes { kind: JobKind },

    #[error("{kind}: all targets must belong to the same wellbore")]
    MixedParents { kind: JobKind },

    #[error("{kind}: wellbore '{uid}' carries a different wellbore uid '{wellbore_uid}'")]
    WellboreUidMismatch {
        kind: JobKind,
        uid: String,
        wellbore_uid: String,
    },

    #[error("{kind}: target '{uid}' is listed more than once")]
    DuplicateTarget { kind: JobKind, uid: String },

    #[error("{kind}: well '{uid}' has no properties to write")]
    NoProperties { kind: JobKind, uid: String },

    #[error("{kind} jobs cannot be cancelled, so they cannot have a kill time")]
    DeadlineNotSupported { kind: JobKind },
}

/// Reasons a cancellation request is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {id} ({kind}) is not cancelable")]
    NotCancelable { id: String, kind: JobKind },

    #[error("Job {0} has already finished")]
    AlreadyFinished(String),
}

/// Defects raised from inside a worker.
///
/// Expected remote failures never use this type; they are carried as
/// values in the worker result instead.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker for {expected} received a {found} payload")]
    UnexpectedPayload { expected: JobKind, found: JobKind },

    #[error("Worker invariant violated: {0}")]
    Invariant(String),
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install log bridge: {0}")]
    LogBridge(#[from] log::SetLoggerError),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub type Result<T> = std::result::Result<T, DrilljobsError>;
