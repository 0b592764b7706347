// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stream relay
//
// Responsibilities:
// - POST /ai-stream: parse {q, tk}, verify the token, open the upstream
//   stream, forward each text fragment as its own chunk
// - GET /v1/heartbeat: liveness
// - Map request failures to 400/401 with no detail leaked
// - Never write anything but model text once streaming has started

mod pump;

pub use pump::{AbortCause, StreamOutcome};

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::config::Config;
use crate::handshake::{build_authority, HandshakeError, TokenAuthority};
use crate::provider::{build_prompt, Adapter, HttpSender, ProviderAdapter, ProviderKind};

/// Default listen port for the relay binary.
pub const DEFAULT_PORT: u16 = 9810;

/// Fragments buffered between the upstream task and a slow client.
const CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Body of `POST /ai-stream`. Short keys are what the page script sends.
#[derive(Debug, Default, Deserialize)]
pub struct StreamRequestBody {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    #[serde(default, alias = "tk")]
    pub token: Option<String>,
    /// Accepted for compatibility with older page scripts. The context that
    /// reaches the prompt is always the one bound to the token.
    #[serde(default)]
    pub context: Option<String>,
}

/// A verified request, ready to be sent upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub query: String,
    pub context: String,
    pub provider: ProviderKind,
}

/// Errors raised before any byte of the stream is written.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay has no API key configured")]
    ConfigurationMissing,

    #[error("query is missing or empty")]
    MissingQuery,

    #[error("token is missing")]
    MissingToken,

    #[error("token rejected: {0}")]
    Unauthorized(#[from] HandshakeError),

    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),
}

impl RelayError {
    /// Stable label for structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            RelayError::ConfigurationMissing => "configuration_missing",
            RelayError::MissingQuery => "missing_query",
            RelayError::MissingToken => "missing_token",
            RelayError::Unauthorized(e) => e.reason(),
            RelayError::MalformedBody(_) => "malformed_body",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::ConfigurationMissing | RelayError::MissingQuery => {
                (StatusCode::BAD_REQUEST, "Error: Missing Key or Query").into_response()
            }
            // No body: the client learns nothing about why.
            RelayError::MissingToken | RelayError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED.into_response()
            }
            RelayError::MalformedBody(_) => {
                (StatusCode::BAD_REQUEST, "request body is not valid JSON").into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Per-process knobs the handler needs on every request.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub provider: ProviderKind,
    pub model: String,
    pub max_sentences: u32,
    pub read_timeout: Duration,
}

/// Shared state injected into axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<dyn TokenAuthority>,
    /// `None` when no API key is configured; every stream request is then
    /// refused.
    pub adapter: Option<Arc<Adapter>>,
    pub http: Arc<dyn HttpSender>,
    pub settings: Arc<RelaySettings>,
}

impl AppState {
    /// Wire authority and adapter from config. The sender is injected so tests
    /// never touch the network.
    ///
    /// In handle mode the authority is private to this state: credentials
    /// must be minted through `state.authority`, never by another process.
    pub fn from_config(config: &Config, http: Arc<dyn HttpSender>) -> Self {
        Self {
            authority: build_authority(config),
            adapter: Adapter::from_config(config).map(Arc::new),
            http,
            settings: Arc::new(RelaySettings {
                provider: config.provider,
                model: config.model.clone(),
                max_sentences: config.generation.max_sentences,
                read_timeout: config.upstream.read_timeout,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Heartbeat endpoint: GET /v1/heartbeat -> 200 OK
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

/// Stream endpoint: POST /ai-stream
pub async fn stream_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4().to_string();

    match open_stream(&state, &request_id, &body) {
        Ok(response) => response,
        Err(e) => {
            match &e {
                RelayError::Unauthorized(_) | RelayError::MissingToken => tracing::info!(
                    request_id = %request_id,
                    reason = e.reason(),
                    "stream request rejected"
                ),
                _ => tracing::debug!(
                    request_id = %request_id,
                    reason = e.reason(),
                    error = %e,
                    "stream request refused"
                ),
            }
            e.into_response()
        }
    }
}

/// Validate the request and, on success, start the upstream task and return
/// the streaming response head.
fn open_stream(state: &AppState, request_id: &str, body: &[u8]) -> Result<Response, RelayError> {
    let adapter = state
        .adapter
        .clone()
        .ok_or(RelayError::ConfigurationMissing)?;

    let parsed: StreamRequestBody =
        serde_json::from_slice(body).map_err(|e| RelayError::MalformedBody(e.to_string()))?;

    let query = parsed
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or(RelayError::MissingQuery)?;
    let token = parsed
        .token
        .filter(|t| !t.is_empty())
        .ok_or(RelayError::MissingToken)?;

    let context = state.authority.verify(&token, &query)?;

    let request = StreamRequest {
        query,
        context,
        provider: state.settings.provider,
    };
    let prompt = build_prompt(
        &request.query,
        &request.context,
        state.settings.max_sentences,
    );
    let upstream_request = adapter.build_request(&prompt);

    tracing::info!(
        request_id = %request_id,
        provider = adapter.name(),
        model = %state.settings.model,
        upstream = upstream_request.url_for_log(),
        "stream opened"
    );

    let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
    let task = pump::StreamTask {
        request_id: request_id.to_string(),
        model: state.settings.model.clone(),
        read_timeout: state.settings.read_timeout,
        started: Instant::now(),
    };
    tokio::spawn(task.run(adapter, state.http.clone(), upstream_request, tx));

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<Bytes, std::io::Error>));
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router with the stream and heartbeat endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/heartbeat", get(heartbeat))
        .route("/ai-stream", post(stream_handler))
        .with_state(state)
}
