use serde::Deserialize;

/// Which job store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStoreBackend {
    /// Volatile in-process map. Jobs are lost on restart.
    Memory,
    /// SQLite table. Jobs survive restarts.
    #[default]
    Sqlite,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// API credential for the judge model. Absence is surfaced as a
    /// configuration error at submission time, not at startup.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub openai_api_base: String,

    /// Multimodal model identifier used for scoring.
    #[serde(default = "default_judge_model")]
    pub judge_model: String,

    /// Frame sampling rate in frames per second.
    #[serde(default = "default_frame_fps")]
    pub frame_fps: u32,

    /// Maximum number of frames sent to the judge model.
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,

    /// Ingested video is truncated to this many seconds.
    #[serde(default = "default_max_seconds")]
    pub max_seconds: u32,

    /// Job store backend selected at startup.
    #[serde(default)]
    pub job_store: JobStoreBackend,

    /// SQLite database path (sqlite backend only).
    #[serde(default = "default_job_db_path")]
    pub job_db_path: String,

    /// Watchdog timeout for a single assessment run. A job whose pipeline
    /// exceeds this is driven to the error state rather than left in
    /// processing forever.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_judge_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_frame_fps() -> u32 {
    1
}

fn default_max_frames() -> usize {
    15
}

fn default_max_seconds() -> u32 {
    12
}

fn default_job_db_path() -> String {
    "/tmp/drill_jobs.sqlite".to_string()
}

fn default_job_timeout_secs() -> u64 {
    120
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_credential() {
        let config: AppConfig = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.judge_model, "gpt-4.1-mini");
        assert_eq!(config.frame_fps, 1);
        assert_eq!(config.max_frames, 15);
        assert_eq!(config.max_seconds, 12);
        assert_eq!(config.job_store, JobStoreBackend::Sqlite);
        assert_eq!(config.job_db_path, "/tmp/drill_jobs.sqlite");
        assert_eq!(config.job_timeout_secs, 120);
    }

    #[test]
    fn overrides_from_environment() {
        let config: AppConfig = envy::from_iter(vec![
            ("OPENAI_API_KEY".to_string(), "sk-test".to_string()),
            ("JOB_STORE".to_string(), "memory".to_string()),
            ("FRAME_FPS".to_string(), "2".to_string()),
            ("MAX_FRAMES".to_string(), "8".to_string()),
        ])
        .unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.job_store, JobStoreBackend::Memory);
        assert_eq!(config.frame_fps, 2);
        assert_eq!(config.max_frames, 8);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let result: Result<AppConfig, _> =
            envy::from_iter(vec![("JOB_STORE".to_string(), "postgres".to_string())]);
        assert!(result.is_err());
    }
}
