use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::judge::JudgeClient;
use crate::store::JobStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn JobStore>,
    /// Absent when no API credential is configured; submission then fails
    /// with a configuration error and no job is created.
    pub judge: Option<Arc<JudgeClient>>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn JobStore>, judge: Option<JudgeClient>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            judge: judge.map(Arc::new),
        }
    }
}
