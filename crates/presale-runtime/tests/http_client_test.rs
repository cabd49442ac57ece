//! Integration tests for the HTTP client, file source and coordinator
//! against a local task API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use presale_models::{ExpectedManifest, SessionId, TaskHandle, TaskStatus};
use presale_runtime::{
    id_from_keys, FetchError, FileSource, HttpFileSource, ManusClient, NoopObserver, RelayError,
    RuntimeConfig, SessionContext, TaskApi, TaskCoordinator, TaskProfile, TaskRequest,
};
use serde_json::{json, Value};

const API_KEY: &str = "test-key";

#[derive(Default)]
struct RemoteState {
    base: String,
    create_reply: Option<(StatusCode, Value)>,
    created: Vec<Value>,
    status_calls: HashMap<String, u32>,
    file_calls: HashMap<String, u32>,
}

#[derive(Clone, Default)]
struct Remote {
    inner: Arc<Mutex<RemoteState>>,
}

impl Remote {
    fn with_create_reply(status: StatusCode, body: Value) -> Self {
        let remote = Self::default();
        remote.inner.lock().unwrap().create_reply = Some((status, body));
        remote
    }

    fn created(&self) -> Vec<Value> {
        self.inner.lock().unwrap().created.clone()
    }

    fn status_calls(&self, id: &str) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .status_calls
            .get(id)
            .copied()
            .unwrap_or(0)
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("API_KEY").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

async fn create_task(
    State(remote): State<Remote>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    let mut state = remote.inner.lock().unwrap();
    state.created.push(body);
    match &state.create_reply {
        Some((status, reply)) => (*status, Json(reply.clone())).into_response(),
        None => Json(json!({"id": "task-1"})).into_response(),
    }
}

async fn task_status(
    State(remote): State<Remote>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    let mut state = remote.inner.lock().unwrap();
    let calls = {
        let calls = state.status_calls.entry(id.clone()).or_insert(0);
        *calls += 1;
        *calls
    };
    let base = state.base.clone();

    match id.as_str() {
        "task-1" if calls == 1 => Json(json!({"status": "running", "progress": 40})).into_response(),
        "task-1" => Json(json!({
            "status": "completed",
            "output": [
                {"type": "file", "fileUrl": format!("{}/files/Deal_Brief.pdf", base), "fileName": "Deal_Brief.pdf", "mimeType": "application/pdf"},
                {"content": [{"fileUrl": format!("{}/files/flaky", base), "fileName": "MAP.xlsx"}]},
                {"fileUrl": format!("{}/files/gone", base), "fileName": "Sources.md"},
                {"fileName": "half.txt"}
            ]
        }))
        .into_response(),
        "task-fail" => Json(json!({"status": "failed", "error": "quota exceeded"})).into_response(),
        _ => (StatusCode::NOT_FOUND, "no such task").into_response(),
    }
}

async fn file(State(remote): State<Remote>, Path(name): Path<String>) -> Response {
    let mut state = remote.inner.lock().unwrap();
    let calls = {
        let calls = state.file_calls.entry(name.clone()).or_insert(0);
        *calls += 1;
        *calls
    };

    match name.as_str() {
        "gone" => StatusCode::NOT_FOUND.into_response(),
        "flaky" if calls == 1 => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => (StatusCode::OK, format!("contents of {}", name)).into_response(),
    }
}

async fn spawn(remote: Remote) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    remote.inner.lock().unwrap().base = base.clone();

    let app = Router::new()
        .route("/v1/tasks", post(create_task))
        .route("/v1/tasks/:id", get(task_status))
        .route("/files/:name", get(file))
        .with_state(remote);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

fn client(base: &str) -> ManusClient {
    ManusClient::new(base, API_KEY, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_create_task_sends_key_and_body() {
    let remote = Remote::default();
    let base = spawn(remote.clone()).await;

    let handle = client(&base)
        .create_task("research acme", "proj-1", "manus-1.6-lite")
        .await
        .unwrap();

    assert_eq!(handle, TaskHandle::from("task-1"));
    assert_eq!(
        remote.created(),
        vec![json!({"prompt": "research acme", "projectId": "proj-1", "agentProfile": "manus-1.6-lite"})]
    );
}

#[tokio::test]
async fn test_create_task_alternate_id_key() {
    let remote = Remote::with_create_reply(StatusCode::OK, json!({"task_id": "t-9"}));
    let base = spawn(remote).await;

    let handle = client(&base).create_task("p", "proj", "lite").await.unwrap();
    assert_eq!(handle.as_str(), "t-9");
}

#[tokio::test]
async fn test_create_task_custom_id_extractor() {
    let remote = Remote::with_create_reply(StatusCode::OK, json!({"taskId": "camel"}));
    let base = spawn(remote).await;

    let client = client(&base).with_id_extractor(id_from_keys(["taskId"]));
    let handle = client.create_task("p", "proj", "lite").await.unwrap();
    assert_eq!(handle.as_str(), "camel");
}

#[tokio::test]
async fn test_create_task_rejections() {
    let base = spawn(Remote::default()).await;
    let wrong_key = ManusClient::new(&base, "wrong", Duration::from_secs(5)).unwrap();
    let err = wrong_key.create_task("p", "proj", "lite").await.unwrap_err();
    assert!(matches!(err, RelayError::RemoteRejection(ref msg) if msg.contains("401")));

    let remote = Remote::with_create_reply(StatusCode::OK, json!({"ok": true}));
    let base = spawn(remote).await;
    let err = client(&base).create_task("p", "proj", "lite").await.unwrap_err();
    assert!(matches!(err, RelayError::RemoteRejection(_)));

    let remote = Remote::with_create_reply(StatusCode::BAD_REQUEST, json!({"error": "bad project"}));
    let base = spawn(remote).await;
    let err = client(&base).create_task("p", "proj", "lite").await.unwrap_err();
    assert!(err.is_task_fatal());
}

#[tokio::test]
async fn test_create_task_unreachable_is_transport() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&base).create_task("p", "proj", "lite").await.unwrap_err();
    assert!(matches!(err, RelayError::Transport(_)));
}

#[tokio::test]
async fn test_status_mapping() {
    let base = spawn(Remote::default()).await;
    let client = client(&base);

    let status = client.get_task_status(&TaskHandle::from("task-1")).await.unwrap();
    assert_eq!(status, TaskStatus::Running { progress: Some(40) });

    let status = client.get_task_status(&TaskHandle::from("task-1")).await.unwrap();
    assert!(matches!(status, TaskStatus::Completed { .. }));

    let status = client.get_task_status(&TaskHandle::from("task-fail")).await.unwrap();
    assert_eq!(
        status,
        TaskStatus::Failed {
            reason: Some("quota exceeded".into())
        }
    );

    // Non-success HTTP is a failed status, not an error.
    let status = client.get_task_status(&TaskHandle::from("nope")).await.unwrap();
    assert_eq!(
        status,
        TaskStatus::Failed {
            reason: Some("HTTP 404: no such task".into())
        }
    );
}

#[tokio::test]
async fn test_http_file_source() {
    let base = spawn(Remote::default()).await;
    let source = HttpFileSource::new();

    let bytes = source.download(&format!("{}/files/a.pdf", base)).await.unwrap();
    assert_eq!(bytes, b"contents of a.pdf");

    let err = source.download(&format!("{}/files/gone", base)).await.unwrap_err();
    assert_eq!(err, FetchError::HttpStatus(404));
}

#[tokio::test]
async fn test_coordinator_end_to_end() {
    let remote = Remote::default();
    let base = spawn(remote.clone()).await;
    let root = tempfile::tempdir().unwrap();

    let config = RuntimeConfig::default()
        .with_poll_interval(Duration::from_millis(20))
        .with_task_timeout(Duration::from_secs(10))
        .with_backoff_base(Duration::from_millis(10))
        .with_download_timeout(Duration::from_secs(5));
    let profile = TaskProfile {
        project_id: "proj-1".into(),
        agent_profile: "manus-1.6-lite".into(),
        manifest: ExpectedManifest::new(["Deal_Brief.pdf", "MAP.xlsx", "Sources.md", "ROI_Calc.xlsx"]),
    };
    let coordinator = TaskCoordinator::new(client(&base), HttpFileSource::new(), profile, config);
    let session = SessionContext::new(SessionId::from("sess-e2e"), root.path());
    let request = TaskRequest::new("https://acme.example", "qualification", "unknown");

    let report = coordinator.run(&session, &request, &NoopObserver).await.unwrap();

    assert_eq!(remote.status_calls("task-1"), 2);
    assert_eq!(report.download_dir, root.path().join("sess-e2e").join("task-1"));

    let delivered: Vec<&str> = report
        .artifacts
        .iter()
        .map(|a| a.display_name.as_str())
        .collect();
    assert_eq!(delivered.len(), 2);
    assert!(delivered.contains(&"Deal_Brief.pdf"));
    assert!(delivered.contains(&"MAP.xlsx"));

    let map = report
        .artifacts
        .iter()
        .find(|a| a.display_name == "MAP.xlsx")
        .unwrap();
    assert_eq!(std::fs::read_to_string(&map.local_path).unwrap(), "contents of flaky");

    assert_eq!(report.not_retrieved.len(), 1);
    assert_eq!(report.not_retrieved[0].reference.display_name, "Sources.md");

    let missing: Vec<&str> = report.completion.missing.iter().map(String::as_str).collect();
    assert_eq!(missing, vec!["ROI_Calc.xlsx", "Sources.md"]);
    assert!(report.completion.unexpected.is_empty());
}
