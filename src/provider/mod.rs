// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Provider adapters (Gemini + OpenAI-compatible chat completions)
//
// Responsibilities:
// - Build the upstream streaming request: endpoint, headers, JSON body
// - Declare how the upstream body is framed
// - Map each framing unit to zero or more text fragments plus a done flag
// - Keep the API key out of logs

mod chat;
mod decoder;
mod gemini;
mod prompt;
mod transport;

pub use chat::ChatCompletionsAdapter;
pub use decoder::{DecodeStats, FragmentDecoder};
pub use gemini::GeminiAdapter;
pub use prompt::build_prompt;
pub use transport::{
    ByteStream, HttpError, HttpRequest, HttpResponse, HttpSender, ReqwestHttpSender,
};

use std::fmt;
use std::time::Duration;

use crate::config::{Config, GenerationConfig, Secret};
use crate::reassembler::{FramingMode, FramingUnit};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// A framing unit the adapter could not turn into fragments. Non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("payload is not valid JSON: {0}")]
    MalformedPayload(String),

    #[error("upstream reported an error: {0}")]
    Upstream(String),

    #[error("unexpected {0} unit for this provider")]
    UnexpectedUnit(&'static str),
}

// ---------------------------------------------------------------------------
// Trait: ProviderAdapter
// ---------------------------------------------------------------------------

/// Which upstream wire format the relay speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Gemini `streamGenerateContent` (Brace-JSON framing).
    Gemini,
    /// OpenAI-compatible `chat/completions` (SSE-Line framing).
    ChatCompletions,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::ChatCompletions => "chat_completions",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text pulled out of one framing unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Non-empty model output, in order.
    pub fragments: Vec<String>,
    /// The upstream signalled end of stream.
    pub done: bool,
}

/// Converts between the relay and one provider's streaming wire format.
///
/// Implementations must be Send + Sync so they can be shared across request
/// handlers via Arc. Closing a stream is dropping its body; adapters hold no
/// per-stream state.
pub trait ProviderAdapter: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Build the upstream request carrying `prompt`.
    fn build_request(&self, prompt: &str) -> HttpRequest;

    /// How the upstream body is cut into units.
    fn framing(&self) -> FramingMode;

    /// Map one unit to text fragments.
    fn extract(&self, unit: &FramingUnit) -> Result<Extraction, ProviderError>;
}

// ---------------------------------------------------------------------------
// Upstream target
// ---------------------------------------------------------------------------

/// Everything an adapter needs to address the upstream.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    pub base_url: String,
    pub model: String,
    pub api_key: Secret,
    pub generation: GenerationConfig,
    /// Bound on waiting for response headers.
    pub response_timeout: Duration,
}

impl UpstreamTarget {
    /// `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        Some(Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone()?,
            generation: config.generation.clone(),
            response_timeout: config.upstream.response_timeout,
        })
    }

    pub(crate) fn response_timeout_ms(&self) -> u64 {
        u64::try_from(self.response_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

// ---------------------------------------------------------------------------
// Closed dispatch
// ---------------------------------------------------------------------------

/// The adapter selected at start-up.
#[derive(Debug, Clone)]
pub enum Adapter {
    Gemini(GeminiAdapter),
    ChatCompletions(ChatCompletionsAdapter),
}

impl Adapter {
    pub fn new(kind: ProviderKind, target: UpstreamTarget) -> Self {
        match kind {
            ProviderKind::Gemini => Adapter::Gemini(GeminiAdapter::new(target)),
            ProviderKind::ChatCompletions => {
                Adapter::ChatCompletions(ChatCompletionsAdapter::new(target))
            }
        }
    }

    /// Adapter for the configured provider, or `None` when the relay is inert.
    pub fn from_config(config: &Config) -> Option<Self> {
        UpstreamTarget::from_config(config).map(|target| Self::new(config.provider, target))
    }

    fn inner(&self) -> &dyn ProviderAdapter {
        match self {
            Adapter::Gemini(adapter) => adapter,
            Adapter::ChatCompletions(adapter) => adapter,
        }
    }
}

impl ProviderAdapter for Adapter {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn build_request(&self, prompt: &str) -> HttpRequest {
        self.inner().build_request(prompt)
    }

    fn framing(&self) -> FramingMode {
        self.inner().framing()
    }

    fn extract(&self, unit: &FramingUnit) -> Result<Extraction, ProviderError> {
        self.inner().extract(unit)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Message of an in-band `{"error": {...}}` object, if the unit is one.
pub(crate) fn upstream_error_message(value: &serde_json::Value) -> Option<String> {
    let error = value.get("error")?;
    let message = error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(message)
}
