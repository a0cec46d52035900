//! Workers that remove data from the store.

use async_trait::async_trait;

use crate::error::WorkerError;
use crate::fanout::BatchWording;
use crate::hub::{ChangeKind, RefreshNotification};
use crate::job::{Job, JobKind};

use super::{unexpected_payload, JobContext, Worker, WorkerOutput, WorkerResult};

/// Deletes many sibling objects, one remote call per object.
pub struct DeleteObjectsWorker;

#[async_trait]
impl Worker for DeleteObjectsWorker {
    fn kind(&self) -> JobKind {
        JobKind::DeleteObjects
    }

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError> {
        let Job::DeleteObjects(payload) = job else {
            return Err(unexpected_payload(self.kind(), job));
        };
        let first = payload
            .objects
            .first()
            .ok_or_else(|| WorkerError::Invariant("delete job without targets".to_string()))?;

        let wording = BatchWording {
            verb: "delete",
            past: "Deleted",
            noun: first.entity_type.plural(),
        };
        let store = ctx.store();
        let batch = ctx
            .fanout()
            .run(
                &payload.objects,
                ctx.signal(),
                |progress| ctx.report_progress(progress),
                |object| store.delete_object(object),
            )
            .await;

        ctx.attach_report(batch.to_report(&format!("Delete {}", wording.noun), wording));

        let wellbore = first.wellbore_display_name().unwrap_or(&first.well_uid);
        let result = batch
            .to_result(wording)
            .with_affected(format!("wellbore '{}'", wellbore));

        let refresh = batch.any_succeeded().then(|| {
            RefreshNotification::objects(
                ctx.server_url(),
                first.entity_type,
                first,
                batch
                    .succeeded_ids()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                ChangeKind::Remove,
            )
        });

        Ok(WorkerOutput::new(result).with_refresh(refresh))
    }
}

/// Deletes components (mnemonics, stations, ...) of one object in a single call.
pub struct DeleteComponentsWorker;

#[async_trait]
impl Worker for DeleteComponentsWorker {
    fn kind(&self) -> JobKind {
        JobKind::DeleteComponents
    }

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError> {
        let Job::DeleteComponents(payload) = job else {
            return Err(unexpected_payload(self.kind(), job));
        };
        let parent = &payload.parent;
        let count = payload.component_uids.len();

        let outcome = ctx
            .store()
            .delete_components(parent, payload.component_type, &payload.component_uids)
            .await;

        let output = match outcome {
            Ok(()) => {
                log::info!(
                    "Deleted {} {}(s) from {}",
                    count,
                    payload.component_type,
                    parent
                );
                let result = WorkerResult::success(format!(
                    "Deleted {} {}(s) from {}",
                    count, payload.component_type, parent
                ))
                .with_affected(parent.to_string());
                WorkerOutput::new(result).with_refresh(Some(RefreshNotification::object(
                    ctx.server_url(),
                    parent,
                    ChangeKind::Update,
                )))
            }
            Err(failure) => {
                log::warn!(
                    "Failed to delete {}(s) from {}: {}",
                    payload.component_type,
                    parent,
                    failure
                );
                WorkerOutput::new(
                    WorkerResult::failure(
                        format!("Failed to delete {}(s) from {}", payload.component_type, parent),
                        failure.reason,
                    )
                    .with_affected(parent.to_string()),
                )
            }
        };
        Ok(output)
    }
}

pub struct DeleteWellWorker;

#[async_trait]
impl Worker for DeleteWellWorker {
    fn kind(&self) -> JobKind {
        JobKind::DeleteWell
    }

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError> {
        let Job::DeleteWell(payload) = job else {
            return Err(unexpected_payload(self.kind(), job));
        };
        let well = &payload.well;

        match ctx.store().delete_object(well).await {
            Ok(()) => {
                log::info!("Deleted {}", well);
                let result = WorkerResult::success(format!("Deleted {}", well))
                    .with_affected(well.to_string());
                Ok(WorkerOutput::new(result).with_refresh(Some(RefreshNotification::well(
                    ctx.server_url(),
                    &well.uid,
                    ChangeKind::Remove,
                ))))
            }
            Err(failure) => {
                log::warn!("Failed to delete {}: {}", well, failure);
                Ok(WorkerOutput::new(
                    WorkerResult::failure(format!("Failed to delete {}", well), failure.reason)
                        .with_affected(well.to_string()),
                ))
            }
        }
    }
}

pub struct DeleteWellboreWorker;

#[async_trait]
impl Worker for DeleteWellboreWorker {
    fn kind(&self) -> JobKind {
        JobKind::DeleteWellbore
    }

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError> {
        let Job::DeleteWellbore(payload) = job else {
            return Err(unexpected_payload(self.kind(), job));
        };
        let wellbore = &payload.wellbore;

        match ctx.store().delete_object(wellbore).await {
            Ok(()) => {
                log::info!("Deleted {}", wellbore);
                let result = WorkerResult::success(format!("Deleted {}", wellbore))
                    .with_affected(wellbore.to_string());
                Ok(
                    WorkerOutput::new(result).with_refresh(Some(RefreshNotification::wellbore(
                        ctx.server_url(),
                        wellbore,
                        ChangeKind::Remove,
                    ))),
                )
            }
            Err(failure) => {
                log::warn!("Failed to delete {}: {}", wellbore, failure);
                Ok(WorkerOutput::new(
                    WorkerResult::failure(format!("Failed to delete {}", wellbore), failure.reason)
                        .with_affected(wellbore.to_string()),
                ))
            }
        }
    }
}
