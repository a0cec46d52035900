//! In-memory [`RemoteStore`] for tests and local experiments.
//!
//! Calls can be scripted per target uid: a failure reason makes every call
//! against that uid fail, a delay holds the call before it resolves. Every
//! dispatched call is logged so tests can assert on what reached the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::remote::{ComponentType, LogPage, ObjectRef, RemoteFailure, RemoteStore, StoreObject};

/// Remote operation recorded by [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Add,
    Update,
    Delete,
    DeleteComponents,
    Get,
    ReadLogPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: StoreOperation,
    pub uid: String,
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<String, StoreObject>,
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    logs: HashMap<String, Vec<Vec<String>>>,
    calls: Vec<StoreCall>,
}

pub struct MemoryStore {
    server_url: String,
    state: Mutex<StoreState>,
    dispatched: AtomicUsize,
}

impl MemoryStore {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            state: Mutex::new(StoreState::default()),
            dispatched: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Memory store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn with_object(self, object: StoreObject) -> Self {
        self.insert(object);
        self
    }

    /// Makes every call against `uid` fail with `reason`.
    pub fn fail(self, uid: impl Into<String>, reason: impl Into<String>) -> Self {
        self.lock().failures.insert(uid.into(), reason.into());
        self
    }

    /// Holds every call against `uid` for `delay` before it resolves.
    pub fn delay(self, uid: impl Into<String>, delay: Duration) -> Self {
        self.lock().delays.insert(uid.into(), delay);
        self
    }

    /// Serves `pages` pages of `rows_per_page` rows for the log `uid`.
    pub fn with_log(self, uid: impl Into<String>, pages: usize, rows_per_page: usize) -> Self {
        let data = (0..pages)
            .map(|page| {
                (0..rows_per_page)
                    .map(|row| format!("{},{}", page * rows_per_page + row, page))
                    .collect()
            })
            .collect();
        self.lock().logs.insert(uid.into(), data);
        self
    }

    pub fn insert(&self, object: StoreObject) {
        self.lock().objects.insert(object.reference.key(), object);
    }

    pub fn get(&self, reference: &ObjectRef) -> Option<StoreObject> {
        self.lock().objects.get(&reference.key()).cloned()
    }

    pub fn contains(&self, reference: &ObjectRef) -> bool {
        self.lock().objects.contains_key(&reference.key())
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Number of calls that reached the store.
    pub fn dispatched_count(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Logs the call, applies the scripted delay and returns the scripted
    /// failure for `uid`, if any.
    async fn begin(&self, operation: StoreOperation, uid: &str) -> Result<(), RemoteFailure> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        let delay = {
            let mut state = self.lock();
            state.calls.push(StoreCall {
                operation,
                uid: uid.to_string(),
            });
            state.delays.get(uid).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.lock().failures.get(uid) {
            Some(reason) => Err(RemoteFailure::new(reason.clone())),
            None => Ok(()),
        }
    }
}

fn not_found(uid: &str) -> RemoteFailure {
    RemoteFailure::new(format!("Object '{}' not found", uid))
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn add_object(&self, object: &StoreObject) -> Result<(), RemoteFailure> {
        self.begin(StoreOperation::Add, &object.reference.uid).await?;
        let mut state = self.lock();
        let key = object.reference.key();
        if state.objects.contains_key(&key) {
            return Err(RemoteFailure::new(format!(
                "Object '{}' already exists",
                object.reference.uid
            )));
        }
        state.objects.insert(key, object.clone());
        Ok(())
    }

    async fn update_object(&self, object: &StoreObject) -> Result<(), RemoteFailure> {
        self.begin(StoreOperation::Update, &object.reference.uid).await?;
        let mut state = self.lock();
        let existing = state
            .objects
            .get_mut(&object.reference.key())
            .ok_or_else(|| not_found(&object.reference.uid))?;
        existing.properties.extend(
            object
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Ok(())
    }

    async fn delete_object(&self, target: &ObjectRef) -> Result<(), RemoteFailure> {
        self.begin(StoreOperation::Delete, &target.uid).await?;
        self.lock()
            .objects
            .remove(&target.key())
            .map(|_| ())
            .ok_or_else(|| not_found(&target.uid))
    }

    async fn delete_components(
        &self,
        parent: &ObjectRef,
        component_type: ComponentType,
        component_uids: &[String],
    ) -> Result<(), RemoteFailure> {
        self.begin(StoreOperation::DeleteComponents, &parent.uid).await?;
        let mut state = self.lock();
        let existing = state
            .objects
            .get_mut(&parent.key())
            .ok_or_else(|| not_found(&parent.uid))?;
        for uid in component_uids {
            existing
                .properties
                .remove(&format!("{}:{}", component_type, uid));
        }
        Ok(())
    }

    async fn get_object(&self, target: &ObjectRef) -> Result<StoreObject, RemoteFailure> {
        self.begin(StoreOperation::Get, &target.uid).await?;
        self.get(target).ok_or_else(|| not_found(&target.uid))
    }

    async fn read_log_page(&self, log: &ObjectRef, page: usize) -> Result<LogPage, RemoteFailure> {
        self.begin(StoreOperation::ReadLogPage, &log.uid).await?;
        let state = self.lock();
        let pages = state.logs.get(&log.uid).ok_or_else(|| not_found(&log.uid))?;
        Ok(LogPage {
            rows: pages.get(page).cloned().unwrap_or_default(),
            has_more: page + 1 < pages.len(),
            total_pages: Some(pages.len()),
        })
    }
}
