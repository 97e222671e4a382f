use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{JobRecord, JobStatus};
use crate::models::score::ScoreReport;
use crate::store::{JobStore, StoreError};

/// Volatile in-process job store. Records live for the process lifetime and
/// are not shared across processes.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, id: Uuid) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        let now = Utc::now();
        jobs.insert(
            id,
            JobRecord {
                id,
                status: JobStatus::Queued,
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        result: Option<ScoreReport>,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.status = status;
        job.result = result;
        job.error = error;
        job.updated_at = Utc::now();
        Ok(())
    }
}
