use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::job::{JobRecord, JobStatus};
use crate::models::score::ScoreReport;
use crate::store::{JobStore, StoreError};

/// Initialize the SQLite connection pool, creating the database file if
/// missing.
pub async fn init_pool(path: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create the jobs table if it does not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            result_json TEXT,
            error TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Durable job store backed by a SQLite table. Rows survive process
/// restarts; the pool tolerates concurrent access.
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, id: Uuid) -> Result<(), StoreError> {
        let now = Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO jobs (id, status, result_json, error, created_at, updated_at)
            VALUES (?1, ?2, NULL, NULL, ?3, ?3)
            "#,
        )
        .bind(id.to_string())
        .bind(JobStatus::Queued.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                StoreError::DuplicateId(id)
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT status, result_json, error, created_at, updated_at
            FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_text: String = row.try_get("status").map_err(StoreError::Database)?;
        let status = JobStatus::from_str(&status_text).map_err(|_| StoreError::Corrupt {
            id,
            reason: format!("unknown status {status_text:?}"),
        })?;

        let result_json: Option<String> = row.try_get("result_json").map_err(StoreError::Database)?;
        let result = match result_json {
            Some(json) => Some(serde_json::from_str::<ScoreReport>(&json).map_err(|e| {
                StoreError::Corrupt {
                    id,
                    reason: format!("undecodable score report: {e}"),
                }
            })?),
            None => None,
        };

        Ok(Some(JobRecord {
            id,
            status,
            result,
            error: row.try_get("error").map_err(StoreError::Database)?,
            created_at: decode_timestamp(id, row.try_get("created_at").map_err(StoreError::Database)?)?,
            updated_at: decode_timestamp(id, row.try_get("updated_at").map_err(StoreError::Database)?)?,
        }))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        result: Option<ScoreReport>,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let result_json = result.map(|r| serde_json::to_string(&r)).transpose()?;
        let now = Utc::now().timestamp();

        let outcome = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?1, result_json = ?2, error = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(status.to_string())
        .bind(result_json)
        .bind(error)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

fn decode_timestamp(id: Uuid, secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| StoreError::Corrupt {
        id,
        reason: format!("timestamp {secs} out of range"),
    })
}
