//! Pipeline state-machine tests using the in-memory store as a fake. The
//! judge endpoint is unreachable, so every run fails before or at the model
//! call; what matters here is that the job record always reaches a terminal
//! state with the payload invariant intact.

use std::sync::Arc;
use std::time::Duration;

use drill_judge::{
    config::AppConfig,
    models::job::JobStatus,
    services::{judge::JudgeClient, pipeline},
    store::{JobStore, MemoryJobStore},
};
use tokio::time::sleep;
use uuid::Uuid;

fn config_with_timeout(secs: u64) -> AppConfig {
    envy::from_iter(vec![
        ("JOB_STORE".to_string(), "memory".to_string()),
        ("JOB_TIMEOUT_SECS".to_string(), secs.to_string()),
    ])
    .expect("test config")
}

fn dead_judge() -> Arc<JudgeClient> {
    Arc::new(JudgeClient::new("http://127.0.0.1:9", "sk-test", "gpt-4.1-mini"))
}

async fn wait_for_terminal(store: &dyn JobStore, id: Uuid, timeout_secs: u64) -> JobStatus {
    for _ in 0..timeout_secs * 10 {
        let job = store.get(id).await.expect("get").expect("job exists");
        if job.status.is_terminal() {
            return job.status;
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("job {id} never reached a terminal state");
}

#[tokio::test]
async fn failed_run_ends_in_error_with_message_only() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id).await.expect("create");

    pipeline::run(
        store.clone(),
        dead_judge(),
        Arc::new(config_with_timeout(30)),
        id,
        b"garbage bytes".to_vec(),
    )
    .await;

    let job = store.get(id).await.expect("get").expect("job exists");
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert!(job.result.is_none());
}

#[tokio::test]
async fn watchdog_drives_stalled_job_to_error() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id).await.expect("create");

    // A zero-second watchdog expires before any real work can finish.
    pipeline::run(
        store.clone(),
        dead_judge(),
        Arc::new(config_with_timeout(0)),
        id,
        b"garbage bytes".to_vec(),
    )
    .await;

    let job = store.get(id).await.expect("get").expect("job exists");
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.result.is_none());
}

#[tokio::test]
async fn spawned_run_is_supervised_to_a_terminal_state() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let id = Uuid::new_v4();
    store.create(id).await.expect("create");

    pipeline::spawn(
        store.clone(),
        dead_judge(),
        Arc::new(config_with_timeout(30)),
        id,
        b"garbage bytes".to_vec(),
    );

    let status = wait_for_terminal(store.as_ref(), id, 20).await;
    assert_eq!(status, JobStatus::Error);
}
