//! Workers that create and modify wells.

use async_trait::async_trait;

use crate::error::WorkerError;
use crate::fanout::BatchWording;
use crate::hub::{ChangeKind, RefreshNotification};
use crate::job::{Job, JobKind};

use super::{unexpected_payload, JobContext, Worker, WorkerOutput, WorkerResult};

pub struct CreateWellWorker;

#[async_trait]
impl Worker for CreateWellWorker {
    fn kind(&self) -> JobKind {
        JobKind::CreateWell
    }

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError> {
        let Job::CreateWell(payload) = job else {
            return Err(unexpected_payload(self.kind(), job));
        };
        let well = &payload.well.reference;

        match ctx.store().add_object(&payload.well).await {
            Ok(()) => {
                log::info!("Created {}", well);
                let result = WorkerResult::success(format!("Created {}", well))
                    .with_affected(well.to_string());
                Ok(WorkerOutput::new(result).with_refresh(Some(RefreshNotification::well(
                    ctx.server_url(),
                    &well.uid,
                    ChangeKind::Add,
                ))))
            }
            Err(failure) => {
                log::warn!("Failed to create {}: {}", well, failure);
                Ok(WorkerOutput::new(
                    WorkerResult::failure(format!("Failed to create {}", well), failure.reason)
                        .with_affected(well.to_string()),
                ))
            }
        }
    }
}

pub struct ModifyWellWorker;

#[async_trait]
impl Worker for ModifyWellWorker {
    fn kind(&self) -> JobKind {
        JobKind::ModifyWell
    }

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError> {
        let Job::ModifyWell(payload) = job else {
            return Err(unexpected_payload(self.kind(), job));
        };
        let well = &payload.well.reference;

        match ctx.store().update_object(&payload.well).await {
            Ok(()) => {
                log::info!(
                    "Modified {} ({} properties)",
                    well,
                    payload.well.properties.len()
                );
                let result = WorkerResult::success(format!("Modified {}", well))
                    .with_affected(well.to_string());
                Ok(WorkerOutput::new(result).with_refresh(Some(RefreshNotification::well(
                    ctx.server_url(),
                    &well.uid,
                    ChangeKind::Update,
                ))))
            }
            Err(failure) => {
                log::warn!("Failed to modify {}: {}", well, failure);
                Ok(WorkerOutput::new(
                    WorkerResult::failure(format!("Failed to modify {}", well), failure.reason)
                        .with_affected(well.to_string()),
                ))
            }
        }
    }
}

/// Applies property updates to many wells, one remote call per well.
pub struct BatchModifyWellsWorker;

#[async_trait]
impl Worker for BatchModifyWellsWorker {
    fn kind(&self) -> JobKind {
        JobKind::BatchModifyWells
    }

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError> {
        let Job::BatchModifyWells(payload) = job else {
            return Err(unexpected_payload(self.kind(), job));
        };

        let wording = BatchWording {
            verb: "modify",
            past: "Modified",
            noun: "wells",
        };
        let store = ctx.store();
        let batch = ctx
            .fanout()
            .run(
                &payload.wells,
                ctx.signal(),
                |progress| ctx.report_progress(progress),
                |well| store.update_object(well),
            )
            .await;

        ctx.attach_report(batch.to_report("Batch modify wells", wording));

        let refresh = batch.any_succeeded().then(|| {
            RefreshNotification::wells_batch(
                ctx.server_url(),
                batch
                    .succeeded_ids()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            )
        });

        Ok(WorkerOutput::new(batch.to_result(wording)).with_refresh(refresh))
    }
}
