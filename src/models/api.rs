use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobStatus;
use crate::models::score::ScoreReport;

/// Response after submitting a routine video for assessment.
#[derive(Debug, Serialize, Deserialize)]
pub struct JudgeAccepted {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// Response for polling an assessment job.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScoreReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness response for the root endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    pub version: String,
}
