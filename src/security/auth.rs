//! Bearer API-key authentication for the HTTP surface.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::ErrorResponse;

const BEARER: &str = "Bearer ";

/// Paths reachable without a key.
const PUBLIC_PATHS: &[&str] = &["/health"];

/// Thread-safe set of accepted API keys.
#[derive(Debug)]
pub struct ApiKeyStore {
    keys: RwLock<HashSet<String>>,
    enabled: bool,
}

impl ApiKeyStore {
    /// Store that requires a key on every non-public route.
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashSet::new()),
            enabled: true,
        }
    }

    /// Store that lets everything through.
    pub fn disabled() -> Self {
        Self {
            keys: RwLock::new(HashSet::new()),
            enabled: false,
        }
    }

    /// Enabled store holding `keys`.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for key in keys {
            store.add_key(key);
        }
        store
    }

    pub fn add_key(&self, key: impl Into<String>) {
        if let Ok(mut keys) = self.keys.write() {
            keys.insert(key.into());
        }
    }

    pub fn is_valid(&self, key: &str) -> bool {
        self.keys
            .read()
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.keys.read().map(|k| k.len()).unwrap_or(0)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Key carried by an `Authorization: Bearer <key>` header value.
    pub fn extract_key(header_value: &str) -> Option<&str> {
        header_value
            .strip_prefix(BEARER)
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("UNAUTHORIZED", message)),
    )
        .into_response()
}

/// Reject requests without a valid bearer key.
pub async fn auth_middleware(
    State(store): State<Arc<ApiKeyStore>>,
    request: Request,
    next: Next,
) -> Response {
    if !store.is_enabled() || PUBLIC_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match header.and_then(ApiKeyStore::extract_key) {
        Some(key) if store.is_valid(key) => next.run(request).await,
        Some(_) => unauthorized("invalid API key"),
        None => unauthorized("missing bearer API key"),
    }
}

/// Generate a random API key.
pub fn generate_api_key() -> String {
    format!("sr_{}", uuid::Uuid::new_v4().simple())
}
