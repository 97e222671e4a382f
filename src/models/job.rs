use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::score::ScoreReport;

/// Status of an assessment job.
///
/// Transitions: `queued` → `processing` → `done` | `error`. Terminal states
/// are never left; transitions are driven exclusively by the assessment
/// pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// One submitted video assessment, tracked from submission to terminal
/// outcome.
///
/// Exactly one of `result` / `error` is populated once the status is
/// terminal; both are absent while the job is queued or processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub status: JobStatus,
    pub result: Option<ScoreReport>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_store_column() {
        for (status, text) in [
            (JobStatus::Queued, "queued"),
            (JobStatus::Processing, "processing"),
            (JobStatus::Done, "done"),
            (JobStatus::Error, "error"),
        ] {
            assert_eq!(status.to_string(), text);
            assert_eq!(JobStatus::from_str(text).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_text_is_rejected() {
        assert!(JobStatus::from_str("pending").is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }
}
