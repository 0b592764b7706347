// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Upstream task: one per stream, owns the upstream connection.
//
// States after a verified request: Streaming -> Completed | Aborted. The
// client only ever sees model text; every ending is reported through
// tracing instead.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::provider::{
    Adapter, DecodeStats, FragmentDecoder, HttpError, HttpRequest, HttpSender, ProviderAdapter,
};

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Upstream sent its end marker or closed cleanly.
    Completed,
    Aborted(AbortCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCause {
    /// Connect or send failed before any response.
    UpstreamUnavailable,
    /// Upstream answered with a non-success status.
    UpstreamStatus(u16),
    /// No response head, or no body bytes, within the configured bound.
    UpstreamTimeout,
    /// The body stream failed mid-way.
    UpstreamTransport,
    /// The client went away; the upstream was dropped.
    ClientDisconnected,
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamOutcome::Completed => f.write_str("completed"),
            StreamOutcome::Aborted(AbortCause::UpstreamUnavailable) => {
                f.write_str("upstream_unavailable")
            }
            StreamOutcome::Aborted(AbortCause::UpstreamStatus(code)) => {
                write!(f, "upstream_status_{code}")
            }
            StreamOutcome::Aborted(AbortCause::UpstreamTimeout) => f.write_str("upstream_timeout"),
            StreamOutcome::Aborted(AbortCause::UpstreamTransport) => {
                f.write_str("upstream_transport")
            }
            StreamOutcome::Aborted(AbortCause::ClientDisconnected) => {
                f.write_str("client_disconnected")
            }
        }
    }
}

/// Per-stream context carried into the spawned task.
pub(super) struct StreamTask {
    pub request_id: String,
    pub model: String,
    pub read_timeout: Duration,
    pub started: Instant,
}

impl StreamTask {
    /// Drive one upstream stream to its end and log the outcome.
    pub(super) async fn run(
        self,
        adapter: Arc<Adapter>,
        http: Arc<dyn HttpSender>,
        request: HttpRequest,
        tx: mpsc::Sender<Bytes>,
    ) -> StreamOutcome {
        let mut decoder = FragmentDecoder::new(adapter.as_ref());
        let outcome = self
            .relay(http.as_ref(), request, &mut decoder, &tx)
            .await;
        let DecodeStats {
            fragments,
            malformed,
        } = decoder.stats();

        match outcome {
            StreamOutcome::Completed | StreamOutcome::Aborted(AbortCause::ClientDisconnected) => {
                tracing::info!(
                    request_id = %self.request_id,
                    provider = adapter.name(),
                    model = %self.model,
                    outcome = %outcome,
                    fragments,
                    malformed,
                    latency_ms = self.started.elapsed().as_millis() as u64,
                    "stream finished"
                )
            }
            StreamOutcome::Aborted(_) => tracing::warn!(
                request_id = %self.request_id,
                provider = adapter.name(),
                model = %self.model,
                outcome = %outcome,
                fragments,
                malformed,
                latency_ms = self.started.elapsed().as_millis() as u64,
                "stream aborted"
            ),
        }
        outcome
    }

    async fn relay(
        &self,
        http: &dyn HttpSender,
        request: HttpRequest,
        decoder: &mut FragmentDecoder<'_>,
        tx: &mpsc::Sender<Bytes>,
    ) -> StreamOutcome {
        // Open. A client that leaves while we wait for headers cancels the send.
        let response = tokio::select! {
            biased;
            _ = tx.closed() => return StreamOutcome::Aborted(AbortCause::ClientDisconnected),
            result = http.send(request) => result,
        };

        let response = match response {
            Ok(response) => response,
            Err(HttpError::Timeout(detail)) => {
                tracing::debug!(
                    request_id = %self.request_id,
                    %detail,
                    "upstream response timed out"
                );
                return StreamOutcome::Aborted(AbortCause::UpstreamTimeout);
            }
            Err(HttpError::Transport(detail)) => {
                tracing::debug!(request_id = %self.request_id, %detail, "upstream send failed");
                return StreamOutcome::Aborted(AbortCause::UpstreamUnavailable);
            }
        };

        if !response.status.is_success() {
            tracing::debug!(
                request_id = %self.request_id,
                status = response.status.as_u16(),
                retry_after = response.retry_after(),
                "upstream rejected request"
            );
            return StreamOutcome::Aborted(AbortCause::UpstreamStatus(response.status.as_u16()));
        }

        let mut body = response.body;

        loop {
            let next = tokio::select! {
                biased;
                _ = tx.closed() => return StreamOutcome::Aborted(AbortCause::ClientDisconnected),
                next = tokio::time::timeout(self.read_timeout, body.next()) => next,
            };

            let chunk = match next {
                Err(_) => return StreamOutcome::Aborted(AbortCause::UpstreamTimeout),
                Ok(None) => {
                    // Clean close: whatever the reassembler still holds is the tail.
                    let tail = decoder.finish();
                    return match forward(tx, tail).await {
                        Ok(()) => StreamOutcome::Completed,
                        Err(cause) => StreamOutcome::Aborted(cause),
                    };
                }
                Ok(Some(Err(HttpError::Timeout(_)))) => {
                    return StreamOutcome::Aborted(AbortCause::UpstreamTimeout)
                }
                Ok(Some(Err(HttpError::Transport(detail)))) => {
                    tracing::debug!(request_id = %self.request_id, %detail, "upstream body failed");
                    return StreamOutcome::Aborted(AbortCause::UpstreamTransport);
                }
                Ok(Some(Ok(chunk))) => chunk,
            };

            if let Err(cause) = forward(tx, decoder.push(&chunk)).await {
                return StreamOutcome::Aborted(cause);
            }
            if decoder.is_done() {
                return StreamOutcome::Completed;
            }
        }
    }
}

/// Write each fragment as its own chunk, in order.
async fn forward(tx: &mpsc::Sender<Bytes>, fragments: Vec<String>) -> Result<(), AbortCause> {
    for fragment in fragments {
        if tx.send(Bytes::from(fragment)).await.is_err() {
            return Err(AbortCause::ClientDisconnected);
        }
    }
    Ok(())
}
