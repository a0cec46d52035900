//! Test harness for running jobs end to end against an in-memory store.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use drilljobs::testing::MemoryStore;
use drilljobs::{
    EngineConfig, Job, JobDispatcher, JobRegistry, JobSnapshot, NotificationHub, WorkerTable,
};

/// Upper bound for any single job in these tests.
pub const JOB_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub dispatcher: JobDispatcher,
}

impl TestHarness {
    /// Harness with the standard workers and default configuration.
    pub fn new(store: MemoryStore) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: MemoryStore, config: EngineConfig) -> Self {
        let workers = WorkerTable::standard().expect("standard table covers every kind");
        Self::build(store, workers, NotificationHub::new(64), config)
    }

    pub fn with_workers(store: MemoryStore, workers: WorkerTable) -> Self {
        Self::build(store, workers, NotificationHub::new(64), EngineConfig::default())
    }

    /// Harness publishing into an existing hub, for multi-server tests.
    pub fn with_hub(store: MemoryStore, hub: NotificationHub) -> Self {
        let workers = WorkerTable::standard().expect("standard table covers every kind");
        Self::build(store, workers, hub, EngineConfig::default())
    }

    fn build(
        store: MemoryStore,
        workers: WorkerTable,
        hub: NotificationHub,
        config: EngineConfig,
    ) -> Self {
        let store = Arc::new(store);
        let dispatcher = JobDispatcher::new(
            store.clone(),
            workers,
            Arc::new(JobRegistry::new()),
            hub,
            config,
        );
        Self { store, dispatcher }
    }

    pub fn submit(&self, job: Job) -> String {
        self.dispatcher.submit(job).expect("job should be valid")
    }

    pub async fn wait(&self, job_id: &str) -> JobSnapshot {
        tokio::time::timeout(JOB_TIMEOUT, self.dispatcher.wait(job_id))
            .await
            .expect("job did not finish in time")
            .expect("job should be registered")
    }

    /// Submits a job and waits for its terminal snapshot.
    pub async fn run(&self, job: Job) -> JobSnapshot {
        let id = self.submit(job);
        self.wait(&id).await
    }
}

/// Engine config dispatching one fan-out target at a time.
pub fn sequential_config() -> EngineConfig {
    EngineConfig {
        fanout_concurrency: Some(1),
        ..EngineConfig::default()
    }
}
