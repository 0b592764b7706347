// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Upstream transport seam.
//
// Adapters describe requests as plain data; an `HttpSender` turns them into
// a streaming response. The relay only ever talks to the trait, so tests
// swap in scripted senders without a network.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use futures_util::stream::Stream;
use futures_util::TryStreamExt;

use crate::config::UpstreamConfig;

/// Sends HTTP requests to the upstream provider.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Bound on waiting for response headers. Body reads are bounded
    /// separately by the caller.
    pub timeout_ms: Option<u64>,
}

impl HttpRequest {
    /// URL safe for logs: the query string may carry the API key.
    pub fn url_for_log(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(path, _)| path)
    }
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl HttpResponse {
    /// Upstream back-off hint on a rejected request, if it sent a readable one.
    pub fn retry_after(&self) -> Option<&str> {
        self.headers.get(RETRY_AFTER)?.to_str().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream request timed out: {0}")]
    Timeout(String),
}

// ---------------------------------------------------------------------------
// Reqwest HTTP sender
// ---------------------------------------------------------------------------

pub struct ReqwestHttpSender {
    client: reqwest::Client,
}

impl ReqwestHttpSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client with the configured connect timeout. The response and read
    /// timeouts are applied per request.
    pub fn from_config(upstream: &UpstreamConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(upstream.connect_timeout)
            .build()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Ok(Self::new(client))
    }
}

fn classify(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout(e.to_string())
    } else {
        HttpError::Transport(e.without_url().to_string())
    }
}

#[async_trait]
impl HttpSender for ReqwestHttpSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let pending = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body)
            .send();

        // reqwest's own per-request timeout covers the whole body, which
        // would cut off long streams; only the header wait is bounded here.
        let resp = match request.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), pending)
                .await
                .map_err(|_| HttpError::Timeout(format!("no response headers after {ms}ms")))?,
            None => pending.await,
        }
        .map_err(classify)?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let stream = resp.bytes_stream().map_err(classify);

        Ok(HttpResponse {
            status,
            headers,
            body: Box::pin(stream),
        })
    }
}
