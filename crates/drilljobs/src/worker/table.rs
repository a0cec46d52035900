//! Static mapping from job kind to worker.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::job::JobKind;

use super::{
    BatchModifyWellsWorker, CopyObjectsWorker, CreateWellWorker, DeleteComponentsWorker,
    DeleteObjectsWorker, DeleteWellWorker, DeleteWellboreWorker, DownloadLogWorker,
    ModifyWellWorker, Worker,
};

/// Total mapping from every [`JobKind`] to its worker.
///
/// Only [`WorkerTableBuilder::build`] creates one, and it refuses to do so
/// while any kind is unmapped, so lookups cannot fail at runtime.
pub struct WorkerTable {
    workers: Vec<Arc<dyn Worker>>,
}

impl WorkerTable {
    pub fn builder() -> WorkerTableBuilder {
        WorkerTableBuilder::default()
    }

    /// Table with the built-in worker for every kind.
    pub fn standard() -> Result<Self, ConfigError> {
        Self::builder().with_standard_workers().build()
    }

    pub fn worker_for(&self, kind: JobKind) -> Arc<dyn Worker> {
        Arc::clone(&self.workers[kind.index()])
    }
}

#[derive(Default)]
pub struct WorkerTableBuilder {
    workers: HashMap<JobKind, Arc<dyn Worker>>,
}

impl WorkerTableBuilder {
    /// Registers a worker under the kind it reports, replacing any
    /// previous registration for that kind.
    pub fn register(mut self, worker: impl Worker + 'static) -> Self {
        let kind = worker.kind();
        if self.workers.insert(kind, Arc::new(worker)).is_some() {
            log::debug!("Replacing worker registered for {}", kind);
        }
        self
    }

    pub fn with_standard_workers(self) -> Self {
        self.register(DeleteObjectsWorker)
            .register(DeleteComponentsWorker)
            .register(DeleteWellWorker)
            .register(DeleteWellboreWorker)
            .register(CreateWellWorker)
            .register(ModifyWellWorker)
            .register(BatchModifyWellsWorker)
            .register(CopyObjectsWorker)
            .register(DownloadLogWorker)
    }

    pub fn build(mut self) -> Result<WorkerTable, ConfigError> {
        let mut workers = Vec::with_capacity(JobKind::ALL.len());
        for kind in JobKind::ALL {
            let worker = self
                .workers
                .remove(&kind)
                .ok_or(ConfigError::UnmappedJobKind(kind))?;
            workers.push(worker);
        }
        log::debug!("Worker table built with {} kinds", workers.len());
        Ok(WorkerTable { workers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::WorkerError;
    use crate::job::Job;
    use crate::worker::{JobContext, WorkerOutput, WorkerResult};

    struct StubWorker(JobKind);

    #[async_trait]
    impl Worker for StubWorker {
        fn kind(&self) -> JobKind {
            self.0
        }

        async fn execute(
            &self,
            _job: &Job,
            _ctx: &JobContext,
        ) -> Result<WorkerOutput, WorkerError> {
            Ok(WorkerOutput::new(WorkerResult::success("stub")))
        }
    }

    #[test]
    fn test_standard_table_covers_every_kind() {
        let table = WorkerTable::standard().unwrap();
        for kind in JobKind::ALL {
            assert_eq!(table.worker_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_unmapped_kind_fails_build() {
        let result = WorkerTable::builder()
            .register(DeleteObjectsWorker)
            .register(DeleteWellWorker)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::UnmappedJobKind(JobKind::DeleteComponents))
        ));
    }

    #[test]
    fn test_empty_builder_fails() {
        assert!(WorkerTable::builder().build().is_err());
    }

    #[test]
    fn test_register_replaces_previous_worker() {
        let table = WorkerTable::builder()
            .with_standard_workers()
            .register(StubWorker(JobKind::DeleteWell))
            .build()
            .unwrap();
        assert_eq!(table.worker_for(JobKind::DeleteWell).kind(), JobKind::DeleteWell);
    }
}
