//! Assessment pipeline: frame extraction → judge model call → job record
//! update. One task per job, spawned fire-and-forget from the submit handler
//! but supervised so that no failure mode leaves a job stuck in
//! `processing`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::job::JobStatus;
use crate::models::score::ScoreReport;
use crate::services::frames::{self, ExtractionError};
use crate::services::judge::{JudgeClient, JudgeError};
use crate::store::{JobStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("frame extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("judge call failed: {0}")]
    Judge(#[from] JudgeError),

    #[error("job store error: {0}")]
    Store(#[from] StoreError),
}

/// Spawn a supervised assessment run for one job.
///
/// The pipeline task records its own outcome in the job store. A second
/// task awaits the pipeline's join handle so that a panic or abort still
/// drives the record to `error` instead of silently vanishing.
pub fn spawn(
    store: Arc<dyn JobStore>,
    judge: Arc<JudgeClient>,
    config: Arc<AppConfig>,
    job_id: Uuid,
    video: Vec<u8>,
) {
    let supervisor_store = store.clone();
    let task = tokio::spawn(run(store, judge, config, job_id, video));

    tokio::spawn(async move {
        let Err(join_err) = task.await else {
            return;
        };
        tracing::error!(job_id = %job_id, error = %join_err, "assessment task aborted");
        counter!("assessment_jobs_failed").increment(1);

        // The task may have reached a terminal state before dying; terminal
        // states are never overwritten.
        let already_terminal = matches!(
            supervisor_store.get(job_id).await,
            Ok(Some(job)) if job.status.is_terminal()
        );
        if !already_terminal {
            if let Err(e) = supervisor_store
                .update_status(
                    job_id,
                    JobStatus::Error,
                    None,
                    Some(format!("assessment task aborted: {join_err}")),
                )
                .await
            {
                tracing::error!(job_id = %job_id, error = %e, "failed to record aborted task");
            }
        }
    });
}

/// Execute the pipeline for one job, bounded by the watchdog timeout, and
/// write the terminal outcome into the job store.
pub async fn run(
    store: Arc<dyn JobStore>,
    judge: Arc<JudgeClient>,
    config: Arc<AppConfig>,
    job_id: Uuid,
    video: Vec<u8>,
) {
    let started = Instant::now();
    let timeout = Duration::from_secs(config.job_timeout_secs);

    let outcome = tokio::time::timeout(
        timeout,
        assess(store.as_ref(), &judge, &config, job_id, &video),
    )
    .await;

    match outcome {
        Ok(Ok(report)) => {
            let total = report.total;
            let confidence = report.confidence;
            finish(store.as_ref(), job_id, JobStatus::Done, Some(report), None).await;
            counter!("assessment_jobs_completed").increment(1);
            tracing::info!(
                job_id = %job_id,
                total,
                confidence,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "assessment complete"
            );
        }
        Ok(Err(e)) => {
            tracing::error!(job_id = %job_id, error = %e, "assessment failed");
            counter!("assessment_jobs_failed").increment(1);
            finish(store.as_ref(), job_id, JobStatus::Error, None, Some(e.to_string())).await;
        }
        Err(_) => {
            tracing::error!(
                job_id = %job_id,
                timeout_secs = config.job_timeout_secs,
                "assessment watchdog expired"
            );
            counter!("assessment_jobs_failed").increment(1);
            finish(
                store.as_ref(),
                job_id,
                JobStatus::Error,
                None,
                Some(format!(
                    "assessment timed out after {}s",
                    config.job_timeout_secs
                )),
            )
            .await;
        }
    }

    histogram!("assessment_processing_seconds").record(started.elapsed().as_secs_f64());
}

/// The sequential pipeline steps. Every failure is terminal for the job;
/// there is no retry at any step.
async fn assess(
    store: &dyn JobStore,
    judge: &JudgeClient,
    config: &AppConfig,
    job_id: Uuid,
    video: &[u8],
) -> Result<ScoreReport, AssessmentError> {
    store
        .update_status(job_id, JobStatus::Processing, None, None)
        .await?;

    let extraction_started = Instant::now();
    let frames = frames::extract(
        video,
        config.frame_fps,
        config.max_frames,
        config.max_seconds,
    )
    .await?;
    histogram!("frame_extraction_seconds").record(extraction_started.elapsed().as_secs_f64());

    tracing::info!(
        job_id = %job_id,
        frames = frames.len(),
        extraction_ms = extraction_started.elapsed().as_millis() as u64,
        "frame extraction complete"
    );

    let report = judge.score(&frames).await?;
    Ok(report)
}

async fn finish(
    store: &dyn JobStore,
    job_id: Uuid,
    status: JobStatus,
    result: Option<ScoreReport>,
    error: Option<String>,
) {
    if let Err(e) = store.update_status(job_id, status, result, error).await {
        tracing::error!(job_id = %job_id, error = %e, "failed to record assessment outcome");
    }
}
