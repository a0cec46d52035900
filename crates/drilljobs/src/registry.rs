//! Registry of submitted jobs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobKind;
use crate::record::{JobRecord, JobSnapshot, JobStatus};

const DEFAULT_PAGE_SIZE: u64 = 100;

// ─── Query types ────────────────────────────────────────────────────────────

/// Query parameters for job listing.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQueryParams {
    pub status: Option<JobStatus>,
    pub kind: Option<JobKind>,
    pub server_url: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Response for job listing with pagination.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListResponse {
    pub jobs: Vec<JobSnapshot>,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

// ─── JobRegistry ────────────────────────────────────────────────────────────

/// In-memory index of job records by id.
///
/// Records stay here after they finish so their final state can still be
/// queried; pruning is left to [`JobRegistry::remove_finished_before`].
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<JobRecord>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_jobs(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<JobRecord>>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_jobs(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<JobRecord>>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn insert(&self, record: Arc<JobRecord>) {
        self.write_jobs().insert(record.id().to_string(), record);
    }

    pub fn get(&self, job_id: &str) -> Option<Arc<JobRecord>> {
        self.read_jobs().get(job_id).cloned()
    }

    pub fn snapshot(&self, job_id: &str) -> Option<JobSnapshot> {
        self.get(job_id).map(|record| record.snapshot())
    }

    pub fn len(&self) -> usize {
        self.read_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_jobs().is_empty()
    }

    /// Number of jobs that have not reached a terminal state.
    pub fn active_count(&self) -> usize {
        self.read_jobs()
            .values()
            .filter(|record| !record.status().is_terminal())
            .count()
    }

    /// Query jobs with filters and pagination, newest first.
    pub fn query(&self, params: &JobQueryParams) -> JobListResponse {
        let mut jobs: Vec<JobSnapshot> = self
            .read_jobs()
            .values()
            .map(|record| record.snapshot())
            .collect();

        if let Some(status) = params.status {
            jobs.retain(|j| j.status == status);
        }
        if let Some(kind) = params.kind {
            jobs.retain(|j| j.kind == kind);
        }
        if let Some(ref server_url) = params.server_url {
            jobs.retain(|j| &j.server_url == server_url);
        }

        jobs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

        let total = jobs.len() as u64;
        let offset = params.offset.unwrap_or(0) as usize;
        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE) as usize;
        let jobs: Vec<JobSnapshot> = jobs.into_iter().skip(offset).take(limit).collect();

        JobListResponse {
            jobs,
            total,
            limit: params.limit,
            offset: params.offset,
        }
    }

    /// Drops terminal records that ended before `cutoff`.
    ///
    /// Returns the number of records removed. Running jobs are never removed.
    pub fn remove_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.write_jobs();
        let before = jobs.len();
        jobs.retain(|_, record| record.ended_at().is_none_or(|ended| ended >= cutoff));
        let removed = before - jobs.len();
        if removed > 0 {
            log::info!("Removed {} finished jobs ended before {}", removed, cutoff);
        }
        removed
    }
}
