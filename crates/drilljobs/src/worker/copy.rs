use async_trait::async_trait;

use crate::error::WorkerError;
use crate::fanout::BatchWording;
use crate::hub::{ChangeKind, RefreshNotification};
use crate::job::{Job, JobKind};

use super::{unexpected_payload, JobContext, Worker, WorkerOutput};

/// Copies sibling objects into another wellbore.
///
/// Each source is read and then written under the target wellbore as one
/// fan-out unit, so a source that cannot be read never blocks the others.
pub struct CopyObjectsWorker;

#[async_trait]
impl Worker for CopyObjectsWorker {
    fn kind(&self) -> JobKind {
        JobKind::CopyObjects
    }

    async fn execute(&self, job: &Job, ctx: &JobContext) -> Result<WorkerOutput, WorkerError> {
        let Job::CopyObjects(payload) = job else {
            return Err(unexpected_payload(self.kind(), job));
        };
        let first = payload
            .sources
            .first()
            .ok_or_else(|| WorkerError::Invariant("copy job without sources".to_string()))?;
        let target = &payload.target_wellbore;

        let wording = BatchWording {
            verb: "copy",
            past: "Copied",
            noun: first.entity_type.plural(),
        };
        let store = ctx.store();
        let batch = ctx
            .fanout()
            .run(
                &payload.sources,
                ctx.signal(),
                |progress| ctx.report_progress(progress),
                move |source| async move {
                    let mut object = store.get_object(source).await?;
                    object.reference = source.moved_to(target);
                    store.add_object(&object).await
                },
            )
            .await;

        ctx.attach_report(batch.to_report(
            &format!("Copy {} to {}", wording.noun, target),
            wording,
        ));

        let result = batch.to_result(wording).with_affected(target.to_string());
        let refresh = batch.any_succeeded().then(|| {
            RefreshNotification::objects(
                ctx.server_url(),
                first.entity_type,
                target,
                batch
                    .succeeded_ids()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                ChangeKind::Add,
            )
        });

        Ok(WorkerOutput::new(result).with_refresh(refresh))
    }
}
