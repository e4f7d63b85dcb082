//! HttpWorkerClient against an in-process fake worker

mod common;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{child_definition, entry, store_with};
use pipeflow::dispatch::VirtualTicker;
use pipeflow::model::{RunOutcome, WorkerDescriptor, WorkerRegistry};
use pipeflow::remote::{
    HttpWorkerClient, RemoteHandle, SubmitRequest, TrustStore, WorkerClient, WorkerError,
};
use pipeflow::testing::ScriptedRuntime;
use pipeflow::{Orchestrator, ParentContext};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WORKER_KEY: &str = "key-1";

#[derive(Default)]
struct FakeWorker {
    submissions: Vec<Value>,
    polls: usize,
    row_queries: Vec<String>,
    aborts: Vec<String>,
    cleanups: Vec<String>,
    releases: Vec<Value>,
}

type Shared = Arc<Mutex<FakeWorker>>;

async fn submit(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    state.lock().unwrap().submissions.push(body);
    ([("x-worker-key", WORKER_KEY)], Json(json!({ "id": "run-1" })))
}

async fn status(
    State(state): State<Shared>,
    Path(_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    state.polls += 1;
    let with_rows = query.get("rows").cloned().unwrap_or_default();
    state.row_queries.push(with_rows.clone());

    let rows = if with_rows == "true" {
        json!([{ "n": 1 }])
    } else {
        json!([])
    };
    (
        [("x-worker-key", WORKER_KEY)],
        Json(json!({
            "running": state.polls < 2,
            "outcome": { "error_count": 0, "rows": rows, "log_text": "line one\nline two" }
        })),
    )
}

async fn abort(State(state): State<Shared>, Path(id): Path<String>) -> StatusCode {
    if id == "gone" {
        return StatusCode::CONFLICT;
    }
    state.lock().unwrap().aborts.push(id);
    StatusCode::OK
}

async fn cleanup(State(state): State<Shared>, Path(id): Path<String>) -> StatusCode {
    state.lock().unwrap().cleanups.push(id);
    StatusCode::OK
}

async fn release(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    state.lock().unwrap().releases.push(body);
    StatusCode::OK
}

/// Serve a fake worker on an ephemeral port and return its URL
async fn serve(state: Shared) -> String {
    let app = Router::new()
        .route("/pipelines", post(submit))
        .route("/pipelines/{id}/status", get(status))
        .route("/pipelines/{id}/abort", post(abort))
        .route("/pipelines/{id}/cleanup", post(cleanup))
        .route("/sockets/release", post(release))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(trust: Arc<TrustStore>) -> HttpWorkerClient {
    HttpWorkerClient::new(Duration::from_secs(5), trust).unwrap()
}

#[tokio::test]
async fn test_submit_poll_fetch_and_cleanup() {
    let state = Shared::default();
    let url = serve(state.clone()).await;
    let trust = Arc::new(TrustStore::new());
    let client = client(trust.clone());
    let worker = WorkerDescriptor::new("etl-1", &url);

    let mut request = SubmitRequest::for_definition(&child_definition(), &["a".to_string()]);
    request.follow_remote_abort = true;
    let handle = client.submit(&worker, &request).await.unwrap();
    assert_eq!(handle.id, "run-1");
    assert_eq!(handle.pipeline, "child");
    assert_eq!(trust.trusted_key(&url).as_deref(), Some(WORKER_KEY));

    let first = client.status(&handle, false).await.unwrap();
    assert!(first.running);
    let outcome = client.fetch_outcome(&handle, true).await.unwrap();
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.log_text.as_deref(), Some("line one\nline two"));

    client.cleanup(&handle).await.unwrap();
    client
        .release_sockets(&worker, "child", Some("cluster-1"))
        .await
        .unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.submissions[0]["pipeline"]["name"], "child");
    assert_eq!(state.submissions[0]["arguments"], json!(["a"]));
    assert_eq!(state.submissions[0]["follow_remote_abort"], true);
    assert_eq!(state.row_queries, vec!["false".to_string(), "true".to_string()]);
    assert_eq!(state.cleanups, vec!["run-1".to_string()]);
    assert_eq!(
        state.releases[0],
        json!({ "pipeline": "child", "run_id": "cluster-1" })
    );
}

#[tokio::test]
async fn test_changed_worker_key_is_rejected() {
    let url = serve(Shared::default()).await;
    let trust = Arc::new(TrustStore::new());
    trust.trust(&url, "previous-key");
    let client = client(trust);

    let request = SubmitRequest::for_definition(&child_definition(), &[]);
    let err = client
        .submit(&WorkerDescriptor::new("etl-1", &url), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::Untrusted { .. }));
}

#[tokio::test]
async fn test_error_status_is_a_rejection() {
    let state = Shared::default();
    let url = serve(state.clone()).await;
    let client = client(Arc::new(TrustStore::new()));
    let handle = RemoteHandle {
        id: "gone".to_string(),
        pipeline: "child".to_string(),
        worker: WorkerDescriptor::new("etl-1", &url),
    };

    let err = client.abort(&handle).await.unwrap_err();
    assert!(matches!(err, WorkerError::Rejected { status: 409, .. }));
    assert!(state.lock().unwrap().aborts.is_empty());
}

#[tokio::test]
async fn test_remote_entry_over_http() {
    let state = Shared::default();
    let url = serve(state.clone()).await;
    let orchestrator = Orchestrator::builder(
        store_with(child_definition()),
        Arc::new(ScriptedRuntime::new()),
        Arc::new(client(Arc::new(TrustStore::new()))),
    )
    .with_ticker(Arc::new(VirtualTicker::new()))
    .build();
    let mut config = entry();
    config.remote_worker = Some("etl-1".to_string());
    config.log_remote_work = true;
    let parent = ParentContext::new("parent")
        .with_workers(WorkerRegistry::new().with_worker(WorkerDescriptor::new("etl-1", &url)));

    let outcome = orchestrator.run(&config, RunOutcome::new(), 0, &parent).await;

    assert!(outcome.succeeded());
    assert_eq!(outcome.rows.len(), 1);
    let state = state.lock().unwrap();
    assert_eq!(state.submissions.len(), 1);
    assert_eq!(state.polls, 3);
    assert_eq!(state.cleanups, vec!["run-1".to_string()]);
}
