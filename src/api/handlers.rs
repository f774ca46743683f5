//! REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::types::{
    AckResponse, ErrorResponse, ExecuteCommandRequest, FileContentResponse, InputRequest,
    ListFilesResponse, ListSessionsResponse, OutputQuery, PathQuery, RenameRequest,
    SignalRequest, UploadRequest, WriteFileRequest,
};
use crate::error::SshRelayError;
use crate::manager::{ConnectOutcome, ExecuteOutcome, SessionManager};
use crate::security::ApiKeyStore;
use crate::session::OutputSnapshot;
use crate::stats::SystemStats;
use crate::transfer::Download;
use crate::transport::Credentials;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub keys: Arc<ApiKeyStore>,
}

impl AppState {
    /// State serving `manager` with authentication disabled.
    pub fn new(manager: SessionManager) -> Self {
        Self {
            manager: Arc::new(manager),
            keys: Arc::new(ApiKeyStore::disabled()),
        }
    }

    pub fn with_api_keys(mut self, keys: ApiKeyStore) -> Self {
        self.keys = Arc::new(keys);
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP status for a manager error.
pub fn status_for(err: &SshRelayError) -> StatusCode {
    match err {
        SshRelayError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        SshRelayError::AlreadyRunning(_)
        | SshRelayError::DispatchPending
        | SshRelayError::NoActiveCommand => StatusCode::CONFLICT,
        SshRelayError::Auth(_) => StatusCode::UNAUTHORIZED,
        SshRelayError::Transport(_)
        | SshRelayError::Channel(_)
        | SshRelayError::TransportClosure(_)
        | SshRelayError::Transfer(_) => StatusCode::BAD_GATEWAY,
        SshRelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SshRelayError::InvalidStateTransition { .. }
        | SshRelayError::Io(_)
        | SshRelayError::LockPoisoned => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: SshRelayError) -> ApiError {
    (status_for(&err), Json(ErrorResponse::from_error(&err)))
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "ssh-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// List all live sessions.
pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<ListSessionsResponse>> {
    let sessions = state.manager.list().map_err(api_error)?;
    Ok(Json(ListSessionsResponse {
        count: sessions.len(),
        sessions,
    }))
}

/// Connect a new session.
pub async fn create_session(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<ConnectOutcome>)> {
    let outcome = state.manager.connect(&credentials).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Disconnect a session. Unknown sessions are not an error.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .manager
        .disconnect(&session_id)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Dispatch a command. Returns as soon as it has started.
pub async fn execute_command(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<ExecuteCommandRequest>,
) -> ApiResult<Json<ExecuteOutcome>> {
    state
        .manager
        .execute_command(&session_id, &req.command, req.force)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Poll the current output.
pub async fn read_output(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<OutputQuery>,
) -> ApiResult<Json<OutputSnapshot>> {
    state
        .manager
        .read_output(&session_id, query.plain)
        .map(Json)
        .map_err(api_error)
}

pub async fn write_input(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<InputRequest>,
) -> ApiResult<Json<AckResponse>> {
    state
        .manager
        .write_input(&session_id, &req.input)
        .await
        .map_err(api_error)?;
    Ok(Json(AckResponse::ok()))
}

pub async fn send_signal(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SignalRequest>,
) -> ApiResult<Json<AckResponse>> {
    state
        .manager
        .send_signal(&session_id, req.signal)
        .await
        .map_err(api_error)?;
    Ok(Json(AckResponse::ok()))
}

pub async fn send_interrupt(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<AckResponse>> {
    state
        .manager
        .send_interrupt(&session_id)
        .await
        .map_err(api_error)?;
    Ok(Json(AckResponse::ok()))
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<ListFilesResponse>> {
    let entries = state
        .manager
        .list_directory(&session_id, &query.path)
        .await
        .map_err(api_error)?;
    Ok(Json(ListFilesResponse {
        path: query.path,
        entries,
    }))
}

/// Recursively delete a file or directory.
pub async fn delete_path(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<PathQuery>,
) -> ApiResult<StatusCode> {
    state
        .manager
        .delete(&session_id, &query.path)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn read_file(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<FileContentResponse>> {
    let content = state
        .manager
        .read_file(&session_id, &query.path)
        .await
        .map_err(api_error)?;
    Ok(Json(FileContentResponse {
        path: query.path,
        content,
    }))
}

pub async fn write_file(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<WriteFileRequest>,
) -> ApiResult<StatusCode> {
    state
        .manager
        .write_file(&session_id, &req.path, &req.content)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rename_path(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<StatusCode> {
    state
        .manager
        .rename(&session_id, &req.from, &req.to)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_file(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<UploadRequest>,
) -> ApiResult<StatusCode> {
    state
        .manager
        .upload(&session_id, &req.path, &req.data)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<Download>> {
    state
        .manager
        .download(&session_id, &query.path)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn system_stats(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SystemStats>> {
    state
        .manager
        .system_stats(&session_id)
        .await
        .map(Json)
        .map_err(api_error)
}
