//! API router configuration.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    api_info, create_session, delete_path, delete_session, download_file, execute_command,
    health, list_files, list_sessions, read_file, read_output, rename_path, send_interrupt,
    send_signal, system_stats, upload_file, write_file, write_input, AppState,
};
use crate::error::SshRelayError;
use crate::security::{auth_middleware, ApiKeyStore};

/// Largest accepted request body. Uploads arrive base64-encoded in JSON.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Create the API router with custom state.
pub fn create_router_with_state(state: AppState) -> Router {
    let file_routes = Router::new()
        .route("/", get(list_files).delete(delete_path))
        .route("/content", get(read_file).put(write_file))
        .route("/rename", post(rename_path))
        .route("/upload", post(upload_file))
        .route("/download", get(download_file));

    // Session routes
    let session_routes = Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/{id}", delete(delete_session))
        .route("/{id}/execute", post(execute_command))
        .route("/{id}/output", get(read_output))
        .route("/{id}/input", post(write_input))
        .route("/{id}/signal", post(send_signal))
        .route("/{id}/interrupt", post(send_interrupt))
        .route("/{id}/stats", get(system_stats))
        .nest("/{id}/files", file_routes);

    let api_v1 = Router::new()
        .route("/", get(api_info))
        .nest("/sessions", session_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .layer(middleware::from_fn_with_state(
            state.keys.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Accepted API keys. `None` disables authentication.
    pub api_keys: Option<Vec<String>>,
    /// Disconnect every session on Ctrl-C before exiting.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Require one of `keys` on every route except `/health`.
    pub fn with_api_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn key_store(&self) -> ApiKeyStore {
        match &self.api_keys {
            Some(keys) => ApiKeyStore::with_keys(keys.iter().cloned()),
            None => ApiKeyStore::disabled(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_keys: None,
            graceful_shutdown: true,
        }
    }
}

/// Start the API server with custom state.
///
/// On Ctrl-C the listener stops accepting requests and every open session
/// is disconnected before this returns.
pub async fn serve_with_state(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let state = state.with_api_keys(config.key_store());
    let manager = state.manager.clone();
    let router = create_router_with_state(state);

    tracing::info!(
        auth = config.api_keys.is_some(),
        "Starting ssh-relay API server on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(SshRelayError::Io)?;

    let server = axum::serve(listener, router);
    let result = if config.graceful_shutdown {
        server.with_graceful_shutdown(shutdown_signal()).await
    } else {
        server.await
    };
    result.map_err(|e| SshRelayError::Io(std::io::Error::other(e.to_string())))?;

    let closed = manager.disconnect_all().await;
    tracing::info!(sessions = closed, "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
