use axum::extract::{Multipart, Path, State};
use axum::Json;
use metrics::counter;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{JobStatusResponse, JudgeAccepted};
use crate::models::job::JobStatus;
use crate::routes::error::ApiError;
use crate::services::pipeline;

/// POST /judge — upload a routine video for assessment.
///
/// Creates the job, schedules the pipeline without blocking, and returns
/// the job id immediately. A missing API credential fails here,
/// synchronously, before any job is created.
pub async fn submit_judge(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<JudgeAccepted>, ApiError> {
    let judge = state
        .judge
        .clone()
        .ok_or_else(|| ApiError::Configuration("OPENAI_API_KEY is not set".to_string()))?;

    let mut video: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart payload: {e}")))?
    {
        if field.name() == Some("video") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read video field: {e}")))?;
            video = Some(data.to_vec());
        }
    }

    let video = video
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing multipart field \"video\"".to_string()))?;

    let job_id = Uuid::new_v4();
    state.store.create(job_id).await?;
    counter!("assessment_jobs_total").increment(1);

    tracing::info!(job_id = %job_id, video_bytes = video.len(), "assessment job created");

    pipeline::spawn(
        state.store.clone(),
        judge,
        state.config.clone(),
        job_id,
        video,
    );

    Ok(Json(JudgeAccepted {
        job_id,
        status: JobStatus::Queued,
    }))
}

/// GET /result/{job_id} — poll an assessment job.
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    // An unparseable id cannot name a job; report it the same way as an
    // unknown one.
    let id = Uuid::parse_str(&job_id).map_err(|_| ApiError::NotFound(job_id.clone()))?;

    let job = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(job_id))?;

    Ok(Json(JobStatusResponse {
        job_id: id,
        status: job.status,
        result: job.result,
        error: job.error,
    }))
}
