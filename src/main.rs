mod app_state;
mod config;
mod models;
mod routes;
mod services;
mod store;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::{AppConfig, JobStoreBackend};
use services::judge::JudgeClient;
use store::{sqlite, JobStore, MemoryJobStore, SqliteJobStore};

const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing drill-judge server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("assessment_jobs_total", "Total assessment jobs submitted");
    metrics::describe_counter!(
        "assessment_jobs_completed",
        "Total assessment jobs that reached done"
    );
    metrics::describe_counter!(
        "assessment_jobs_failed",
        "Total assessment jobs that reached error"
    );
    metrics::describe_histogram!(
        "assessment_processing_seconds",
        "End-to-end time for one assessment run"
    );
    metrics::describe_histogram!(
        "frame_extraction_seconds",
        "Time spent sampling frames from the uploaded video"
    );

    // Initialize the job store selected by configuration
    let job_store: Arc<dyn JobStore> = match config.job_store {
        JobStoreBackend::Memory => {
            tracing::info!("Using in-memory job store");
            Arc::new(MemoryJobStore::new())
        }
        JobStoreBackend::Sqlite => {
            tracing::info!(path = %config.job_db_path, "Opening SQLite job store");
            let pool = sqlite::init_pool(&config.job_db_path)
                .await
                .expect("Failed to open job database");
            sqlite::init_schema(&pool)
                .await
                .expect("Failed to initialize job schema");
            Arc::new(SqliteJobStore::new(pool))
        }
    };

    // Initialize the judge model client when a credential is configured.
    // Without one the server still starts; submissions fail synchronously.
    let judge = match &config.openai_api_key {
        Some(key) => Some(JudgeClient::new(
            &config.openai_api_base,
            key,
            &config.judge_model,
        )),
        None => {
            tracing::warn!("OPENAI_API_KEY is not set; submissions will be rejected");
            None
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, job_store, judge);

    // Build API routes
    let app = routes::app(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES));

    tracing::info!("Starting drill-judge on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
