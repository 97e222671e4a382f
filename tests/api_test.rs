//! API tests: the full HTTP surface served on a real listener, backed by
//! the in-memory job store.

use std::sync::Arc;
use std::time::Duration;

use drill_judge::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::judge::JudgeClient,
    store::{JobStore, MemoryJobStore},
};
use reqwest::multipart;
use serde_json::Value;
use tokio::time::sleep;
use uuid::Uuid;

fn test_config() -> AppConfig {
    envy::from_iter(vec![
        ("JOB_STORE".to_string(), "memory".to_string()),
        ("JOB_TIMEOUT_SECS".to_string(), "30".to_string()),
    ])
    .expect("test config")
}

/// Serve the app on an ephemeral port. The judge client points at a dead
/// endpoint; tests that exercise the happy path mock the model separately.
async fn spawn_app(with_credential: bool) -> String {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let judge = with_credential
        .then(|| JudgeClient::new("http://127.0.0.1:9", "sk-test", "gpt-4.1-mini"));
    let state = AppState::new(test_config(), store, judge);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, routes::app(state))
            .await
            .expect("test server");
    });

    format!("http://{addr}")
}

async fn submit_video(
    client: &reqwest::Client,
    base_url: &str,
    bytes: Vec<u8>,
) -> reqwest::Response {
    let form = multipart::Form::new().part(
        "video",
        multipart::Part::bytes(bytes)
            .file_name("routine.mp4")
            .mime_str("video/mp4")
            .expect("mime"),
    );
    client
        .post(format!("{base_url}/judge"))
        .multipart(form)
        .send()
        .await
        .expect("submit request")
}

/// Poll until the job reaches a terminal state.
async fn poll_until_terminal(
    client: &reqwest::Client,
    base_url: &str,
    job_id: &str,
    timeout_secs: u64,
) -> Value {
    let max_attempts = timeout_secs * 10;
    for _ in 0..max_attempts {
        let body: Value = client
            .get(format!("{base_url}/result/{job_id}"))
            .send()
            .await
            .expect("poll request")
            .json()
            .await
            .expect("poll body");

        match body["status"].as_str() {
            Some("done") | Some("error") => return body,
            Some("queued") | Some("processing") => sleep(Duration::from_millis(100)).await,
            other => panic!("unexpected job status: {other:?}"),
        }
    }
    panic!("job {job_id} did not reach a terminal state within {timeout_secs}s");
}

#[tokio::test]
async fn liveness_reports_ok() {
    let base_url = spawn_app(true).await;
    let body: Value = reqwest::get(&base_url)
        .await
        .expect("liveness request")
        .json()
        .await
        .expect("liveness body");

    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn missing_credential_rejects_submission() {
    let base_url = spawn_app(false).await;
    let client = reqwest::Client::new();

    let response = submit_video(&client, &base_url, b"clip".to_vec()).await;
    assert_eq!(response.status(), 500);

    let body: Value = response.json().await.expect("error body");
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn missing_video_field_is_a_bad_request() {
    let base_url = spawn_app(true).await;
    let client = reqwest::Client::new();

    let form = multipart::Form::new().text("note", "no video here");
    let response = client
        .post(format!("{base_url}/judge"))
        .multipart(form)
        .send()
        .await
        .expect("submit request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("error body");
    assert!(body["error"].as_str().expect("error message").contains("video"));
}

#[tokio::test]
async fn unknown_job_id_is_not_found() {
    let base_url = spawn_app(true).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base_url}/result/{}", Uuid::new_v4()))
        .send()
        .await
        .expect("poll request");

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("error body");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_job_id_is_not_found() {
    let base_url = spawn_app(true).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base_url}/result/not-a-uuid"))
        .send()
        .await
        .expect("poll request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn corrupt_video_reaches_error_state() {
    let base_url = spawn_app(true).await;
    let client = reqwest::Client::new();

    let response = submit_video(&client, &base_url, b"not a real video stream".to_vec()).await;
    assert_eq!(response.status(), 200);

    let accepted: Value = response.json().await.expect("accepted body");
    assert_eq!(accepted["status"], "queued");
    let job_id = accepted["job_id"].as_str().expect("job id").to_string();

    let terminal = poll_until_terminal(&client, &base_url, &job_id, 20).await;
    assert_eq!(terminal["status"], "error");
    assert!(terminal["error"].as_str().expect("error message").len() > 0);
    assert!(terminal.get("result").is_none() || terminal["result"].is_null());
}

#[tokio::test]
async fn polling_is_idempotent_for_terminal_jobs() {
    let base_url = spawn_app(true).await;
    let client = reqwest::Client::new();

    let response = submit_video(&client, &base_url, b"still not a video".to_vec()).await;
    let accepted: Value = response.json().await.expect("accepted body");
    let job_id = accepted["job_id"].as_str().expect("job id").to_string();

    let first = poll_until_terminal(&client, &base_url, &job_id, 20).await;
    let second: Value = client
        .get(format!("{base_url}/result/{job_id}"))
        .send()
        .await
        .expect("second poll")
        .json()
        .await
        .expect("second body");

    assert_eq!(first, second);
}
