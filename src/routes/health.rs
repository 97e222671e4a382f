use axum::Json;

use crate::models::api::LivenessResponse;

/// GET / — liveness probe.
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
