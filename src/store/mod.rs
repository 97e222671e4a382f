//! Job store abstraction.
//!
//! Two implementations share one contract: a volatile in-process map and a
//! SQLite table that survives restarts. Each job record has exactly one
//! writer (the pipeline task handling it), so the contract is plain
//! last-writer-wins with no compare-and-swap.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::job::{JobRecord, JobStatus};
use crate::models::score::ScoreReport;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new record with status `queued` and current timestamps.
    async fn create(&self, id: Uuid) -> Result<(), StoreError>;

    /// Look up a job by id.
    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;

    /// Overwrite status, result and error, refreshing `updated_at`.
    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        result: Option<ScoreReport>,
        error: Option<String>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} already exists")]
    DuplicateId(Uuid),

    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to encode score report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("corrupt job record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}
