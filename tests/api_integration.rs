//! API integration tests.
//!
//! Every request goes through the full axum router against a scripted
//! in-memory remote, so no SSH server is needed.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use ssh_relay::api::{create_router_with_state, AppState};
use ssh_relay::security::ApiKeyStore;
use ssh_relay::transport::memory::MemoryRemote;
use ssh_relay::{ManagerOptions, SessionManager, Signal};
use tower::ServiceExt;

fn app(remote: &MemoryRemote) -> Router {
    let manager = SessionManager::new(Arc::new(remote.connector()));
    create_router_with_state(AppState::new(manager))
}

/// Commands run without a PTY, so stderr stays a separate stream.
fn app_without_pty(remote: &MemoryRemote) -> Router {
    let manager = SessionManager::new(Arc::new(remote.connector())).with_options(ManagerOptions {
        pty: None,
        ..ManagerOptions::default()
    });
    create_router_with_state(AppState::new(manager))
}

/// Helper to create a JSON request.
fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper to extract body as string.
async fn response_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&body).to_string()
}

/// Helper to extract JSON from response.
async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request(method, uri, body))
        .await
        .unwrap();
    let status = response.status();
    (status, response_json(response).await)
}

async fn connect(app: &Router) -> String {
    let (status, json) = call(
        app,
        Method::POST,
        "/api/v1/sessions",
        Some(json!({"host": "10.0.0.5", "username": "deploy", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["session_id"].as_str().unwrap().to_string()
}

async fn execute(app: &Router, id: &str, command: &str, force: bool) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/execute"),
        Some(json!({"command": command, "force": force})),
    )
    .await
}

async fn output(app: &Router, id: &str) -> Value {
    let (status, json) = call(
        app,
        Method::GET,
        &format!("/api/v1/sessions/{id}/output"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json
}

/// Poll until the command finishes.
async fn wait_done(app: &Router, id: &str) -> Value {
    for _ in 0..200 {
        let json = output(app, id).await;
        if json["is_running"] == false {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("command did not finish");
}

/// Poll until `pred` holds for the output snapshot.
async fn wait_for_output(app: &Router, id: &str, pred: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..200 {
        let json = output(app, id).await;
        if pred(&json) {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("output never matched");
}

// ============================================================================
// Health & Info Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = app(&MemoryRemote::new());

    let response = app
        .oneshot(json_request(Method::GET, "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_text(response).await, "OK");
}

#[tokio::test]
async fn test_api_info_endpoint() {
    let app = app(&MemoryRemote::new());

    let (status, json) = call(&app, Method::GET, "/api/v1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "ssh-relay");
    assert_eq!(json["status"], "running");
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_list_sessions_empty() {
    let app = app(&MemoryRemote::new());

    let (status, json) = call(&app, Method::GET, "/api/v1/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
    assert!(json["sessions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_session() {
    let app = app(&MemoryRemote::new());

    let (status, json) = call(
        &app,
        Method::POST,
        "/api/v1/sessions",
        Some(json!({"host": "10.0.0.5", "port": 2222, "username": "deploy", "password": "pw"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert!(json["os_info"].as_str().unwrap().contains("Ubuntu"));

    let (_, list) = call(&app, Method::GET, "/api/v1/sessions", None).await;
    assert_eq!(list["count"], 1);
    let summary = &list["sessions"][0];
    assert_eq!(summary["session_id"], json["session_id"]);
    assert_eq!(summary["host"], "10.0.0.5");
    assert_eq!(summary["port"], 2222);
    assert_eq!(summary["state"], "idle");
}

#[tokio::test]
async fn test_create_session_bad_password() {
    let remote = MemoryRemote::new().with_password("right");
    let app = app(&remote);

    let (status, json) = call(
        &app,
        Method::POST,
        "/api/v1/sessions",
        Some(json!({"host": "10.0.0.5", "username": "deploy", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "AUTH_FAILED");

    let (_, list) = call(&app, Method::GET, "/api/v1/sessions", None).await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_create_session_unreachable() {
    let remote = MemoryRemote::new();
    remote.refuse_connections(true);
    let app = app(&remote);

    let (status, json) = call(
        &app,
        Method::POST,
        "/api/v1/sessions",
        Some(json!({"host": "10.0.0.5", "username": "deploy", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "TRANSPORT_ERROR");
}

#[tokio::test]
async fn test_concurrent_sessions_are_distinct() {
    let app = app(&MemoryRemote::new());

    let (a, b) = tokio::join!(connect(&app), connect(&app));
    assert_ne!(a, b);

    let (_, list) = call(&app, Method::GET, "/api/v1/sessions", None).await;
    assert_eq!(list["count"], 2);
}

// ============================================================================
// Command Tests
// ============================================================================

#[tokio::test]
async fn test_echo_hello() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    let (status, json) = execute(&app, &id, "echo hello", false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_risky"], false);

    let done = wait_done(&app, &id).await;
    assert!(done["output"].as_str().unwrap().contains("hello"));
    assert_eq!(done["is_error"], false);
    assert_eq!(done["exit_code"], 0);
}

#[tokio::test]
async fn test_missing_path_sets_error_flag() {
    let app = app_without_pty(&MemoryRemote::new());
    let id = connect(&app).await;

    execute(&app, &id, "ls /nonexistent", false).await;

    let done = wait_done(&app, &id).await;
    assert_eq!(done["is_error"], true);
    assert!(done["output"]
        .as_str()
        .unwrap()
        .contains("No such file or directory"));
}

#[tokio::test]
async fn test_pty_merges_diagnostics_into_output() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    execute(&app, &id, "ls /nonexistent", false).await;

    let done = wait_done(&app, &id).await;
    assert_eq!(done["is_error"], false);
    assert_eq!(done["exit_code"], 2);
    assert!(done["output"]
        .as_str()
        .unwrap()
        .contains("No such file or directory"));
}

#[tokio::test]
async fn test_nonzero_exit_without_stderr_is_not_error() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    execute(&app, &id, "false", false).await;

    let done = wait_done(&app, &id).await;
    assert_eq!(done["is_error"], false);
    assert_eq!(done["exit_code"], 1);
}

#[tokio::test]
async fn test_risky_command_held_until_forced() {
    let remote = MemoryRemote::new();
    remote.mkdir("/tmp/x");
    remote.put_file("/tmp/x/a.txt", "a");
    let app = app(&remote);
    let id = connect(&app).await;

    let (status, json) = execute(&app, &id, "rm -rf /tmp/x", false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_risky"], true);
    assert!(!remote.commands().iter().any(|c| c.starts_with("rm")));
    assert!(remote.exists("/tmp/x/a.txt"));

    let snapshot = output(&app, &id).await;
    assert_eq!(snapshot["is_running"], false);
    assert_eq!(snapshot["output"], "");

    let (_, json) = execute(&app, &id, "rm -rf /tmp/x", true).await;
    assert_eq!(json["is_risky"], false);
    wait_done(&app, &id).await;
    assert!(!remote.exists("/tmp/x"));
}

#[tokio::test]
async fn test_already_running_keeps_buffer() {
    let remote = MemoryRemote::new();
    let app = app(&remote);
    let id = connect(&app).await;

    execute(&app, &id, "cat", false).await;
    call(
        &app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/input"),
        Some(json!({"input": "first"})),
    )
    .await;
    let before = wait_for_output(&app, &id, |o| {
        o["output"].as_str().unwrap_or("").contains("first")
    })
    .await;

    let (status, json) = execute(&app, &id, "echo second", false).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "ALREADY_RUNNING");

    let after = output(&app, &id).await;
    assert_eq!(after["output"], before["output"]);
    assert_eq!(after["is_running"], true);
    assert!(!remote.commands().contains(&"echo second".to_string()));

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/interrupt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let done = wait_done(&app, &id).await;
    assert!(done["output"].as_str().unwrap().contains("^C"));
}

#[tokio::test]
async fn test_read_output_is_idempotent() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    execute(&app, &id, "echo stable", false).await;
    let first = wait_done(&app, &id).await;

    for _ in 0..5 {
        assert_eq!(output(&app, &id).await, first);
    }
}

#[tokio::test]
async fn test_plain_output_strips_escapes() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    execute(&app, &id, "echo \x1b[1;32mgreen\x1b[0m", false).await;
    wait_done(&app, &id).await;

    let (_, json) = call(
        &app,
        Method::GET,
        &format!("/api/v1/sessions/{id}/output?plain=true"),
        None,
    )
    .await;
    assert_eq!(json["output"], "green\n");
}

#[tokio::test]
async fn test_input_reaches_running_command() {
    let remote = MemoryRemote::new();
    let app = app(&remote);
    let id = connect(&app).await;

    execute(&app, &id, "cat", false).await;
    let (status, json) = call(
        &app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/input"),
        Some(json!({"input": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    wait_for_output(&app, &id, |o| {
        o["output"].as_str().unwrap_or("").contains("hello")
    })
    .await;
    assert_eq!(remote.inputs(), vec![b"hello\n".to_vec()]);
}

#[tokio::test]
async fn test_input_without_command_conflicts() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    let (status, json) = call(
        &app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/input"),
        Some(json!({"input": "y"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "NO_ACTIVE_COMMAND");
}

#[tokio::test]
async fn test_signal_stops_command() {
    let remote = MemoryRemote::new();
    let app = app(&remote);
    let id = connect(&app).await;

    execute(&app, &id, "sleep 100", false).await;
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/signal"),
        Some(json!({"signal": "TERM"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let done = wait_done(&app, &id).await;
    assert_eq!(done["exit_code"], 143);
    assert_eq!(remote.signals(), vec![Signal::Term]);
}

#[tokio::test]
async fn test_unknown_signal_rejected() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/signal"),
        Some(json!({"signal": "HUP"})),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_channel_failure_reported_in_buffer() {
    let remote = MemoryRemote::new();
    let app = app(&remote);
    let id = connect(&app).await;

    remote.fail_channels(true);
    let (status, json) = execute(&app, &id, "echo hi", false).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "CHANNEL_ERROR");

    let snapshot = output(&app, &id).await;
    assert_eq!(snapshot["is_running"], false);
    assert_eq!(snapshot["is_error"], true);

    remote.fail_channels(false);
    let (status, _) = execute(&app, &id, "echo again", false).await;
    assert_eq!(status, StatusCode::OK);
    let done = wait_done(&app, &id).await;
    assert!(done["output"].as_str().unwrap().contains("again"));
    assert_eq!(done["is_error"], false);
}

// ============================================================================
// File Transfer Tests
// ============================================================================

#[tokio::test]
async fn test_upload_download_round_trip() {
    let remote = MemoryRemote::new();
    let app = app(&remote);
    let id = connect(&app).await;

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/files/upload"),
        Some(json!({
            "path": "/tmp/blob.bin",
            "data": "data:application/octet-stream;base64,AAEC/w=="
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(remote.file("/tmp/blob.bin"), Some(vec![0, 1, 2, 255]));

    let (status, json) = call(
        &app,
        Method::GET,
        &format!("/api/v1/sessions/{id}/files/download?path=/tmp/blob.bin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], "AAEC/w==");
    assert_eq!(json["size"], 4);
    assert_eq!(
        json["data_uri"],
        "data:application/octet-stream;base64,AAEC/w=="
    );
}

#[tokio::test]
async fn test_upload_rejects_bad_payload() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    let (status, json) = call(
        &app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/files/upload"),
        Some(json!({"path": "/tmp/x", "data": "not base64!"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_write_read_rename_list() {
    let remote = MemoryRemote::new();
    let app = app(&remote);
    let id = connect(&app).await;

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/sessions/{id}/files/content"),
        Some(json!({"path": "/home/notes.txt", "content": "remember"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = call(
        &app,
        Method::GET,
        &format!("/api/v1/sessions/{id}/files/content?path=/home/notes.txt"),
        None,
    )
    .await;
    assert_eq!(json["content"], "remember");

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/sessions/{id}/files/rename"),
        Some(json!({"from": "/home/notes.txt", "to": "/home/todo.txt"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!remote.exists("/home/notes.txt"));

    let (status, json) = call(
        &app,
        Method::GET,
        &format!("/api/v1/sessions/{id}/files?path=/home"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["todo.txt"]);
    assert_eq!(json["entries"][0]["is_directory"], false);
    assert_eq!(json["entries"][0]["size"], 8);
}

#[tokio::test]
async fn test_delete_directory_recursively() {
    let remote = MemoryRemote::new();
    remote.mkdir("/tmp/build");
    remote.mkdir("/tmp/build/obj");
    remote.put_file("/tmp/build/obj/main.o", "o");
    remote.put_file("/tmp/build/log.txt", "l");
    let app = app(&remote);
    let id = connect(&app).await;

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/v1/sessions/{id}/files?path=/tmp/build"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!remote.exists("/tmp/build"));
    assert!(!remote.exists("/tmp/build/obj/main.o"));
    assert!(remote.exists("/tmp"));
}

#[tokio::test]
async fn test_delete_root_refused() {
    let remote = MemoryRemote::new();
    let app = app(&remote);
    let id = connect(&app).await;

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/v1/sessions/{id}/files?path=/"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(remote.exists("/home"));
}

#[tokio::test]
async fn test_transfer_failure_keeps_session() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    let (status, json) = call(
        &app,
        Method::GET,
        &format!("/api/v1/sessions/{id}/files/content?path=/nope"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "TRANSFER_FAILED");

    execute(&app, &id, "echo alive", false).await;
    let done = wait_done(&app, &id).await;
    assert!(done["output"].as_str().unwrap().contains("alive"));
}

// ============================================================================
// Stats Tests
// ============================================================================

#[tokio::test]
async fn test_system_stats() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    let (status, json) = call(
        &app,
        Method::GET,
        &format!("/api/v1/sessions/{id}/stats"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["memory"]["total"], 3936.0);
    assert_eq!(json["memory"]["used"], 1210.0);
    assert_eq!(json["disk"]["total"], 29.0);

    // the interactive channel was never used
    assert_eq!(output(&app, &id).await["output"], "");
}

// ============================================================================
// Teardown Tests
// ============================================================================

#[tokio::test]
async fn test_disconnect_then_not_found() {
    let app = app(&MemoryRemote::new());
    let id = connect(&app).await;

    let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = call(
        &app,
        Method::GET,
        &format!("/api/v1/sessions/{id}/output"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "SESSION_NOT_FOUND");

    let (status, _) = execute(&app, &id, "echo hi", false).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // disconnect is idempotent
    let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_disconnect_unknown_session() {
    let app = app(&MemoryRemote::new());

    let (status, _) = call(&app, Method::DELETE, "/api/v1/sessions/not-a-session", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_remote_close_tears_down_session() {
    let remote = MemoryRemote::new();
    let app = app(&remote);
    let id = connect(&app).await;
    execute(&app, &id, "sleep 100", false).await;

    remote.close_remote();

    for _ in 0..200 {
        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/api/v1/sessions/{id}/output"),
            None,
        )
        .await;
        if status == StatusCode::NOT_FOUND {
            let (_, list) = call(&app, Method::GET, "/api/v1/sessions", None).await;
            assert_eq!(list["count"], 0);
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session survived remote close");
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_session_not_found() {
    let app = app(&MemoryRemote::new());

    let (status, json) = execute(&app, "00000000-0000-0000-0000-000000000000", "ls", false).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_json_body() {
    let app = app(&MemoryRemote::new());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/sessions")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{invalid json}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_method_not_allowed() {
    let app = app(&MemoryRemote::new());

    let response = app
        .oneshot(json_request(Method::PATCH, "/api/v1/sessions", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_api_key_required() {
    let remote = MemoryRemote::new();
    let state = AppState::new(SessionManager::new(Arc::new(remote.connector())))
        .with_api_keys(ApiKeyStore::with_keys(["sr_test"]));
    let app = create_router_with_state(state);

    let (status, _) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(&app, Method::GET, "/api/v1/sessions", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/sessions")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/sessions")
                .header(header::AUTHORIZATION, "Bearer sr_test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
