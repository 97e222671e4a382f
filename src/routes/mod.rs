use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

pub mod error;
pub mod health;
pub mod judge;
pub mod metrics;

/// Build the API router. Middleware layers and the metrics scrape endpoint
/// are wired up in `main`, which owns the Prometheus recorder handle.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::liveness))
        .route("/judge", post(judge::submit_judge))
        .route("/result/{job_id}", get(judge::get_result))
        .with_state(state)
}
