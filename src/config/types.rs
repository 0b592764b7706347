// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::time::Duration;

use crate::provider::ProviderKind;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level parsed and validated relay config.
///
/// Loaded once at process start and shared behind an `Arc`; never re-read.
#[derive(Debug)]
pub struct Config {
    /// Config format version. Always "v1".
    pub version: String,
    /// Upstream wire format, selected once here and never re-checked.
    pub provider: ProviderKind,
    /// Provider API key. `None` leaves the whole feature inert.
    pub api_key: Option<Secret>,
    /// Upstream model identifier.
    pub model: String,
    /// Upstream base URL without trailing slash.
    pub base_url: String,
    pub generation: GenerationConfig,
    pub token: TokenConfig,
    pub upstream: UpstreamConfig,
    /// How many ranked search results go into the prompt context.
    pub results_limit: usize,
    /// SHA256 hash of the raw YAML bytes: "sha256:{hex}".
    pub config_hash: String,
}

impl Config {
    /// True when an API key is configured and the relay can serve streams.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// A string that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Generation parameters forwarded to the upstream model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Upper bound on output tokens (`maxOutputTokens` / `max_tokens`).
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Sentence bound written into the prompt template.
    pub max_sentences: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 400,
            temperature: 0.3,
            max_sentences: 4,
        }
    }
}

/// Which handshake variant issues and verifies credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    /// Stateless HMAC-signed tokens; verifiable by any worker sharing the secret.
    Signed,
    /// Random single-use handles held in process memory.
    ///
    /// Only the authority that minted a handle can redeem it. The standalone
    /// `answer-relay` server mints nothing itself, so in this mode it rejects
    /// every stream with 401; the mode is for embedders that issue through
    /// the same `AppState::authority` they serve with.
    Handle,
}

/// Handshake configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub mode: TokenMode,
    /// Operator-supplied signing secret. When absent the secret is derived
    /// from the API key.
    pub secret: Option<Secret>,
    /// Credential lifetime.
    pub ttl: Duration,
    /// Reject a second verification of the same signed token within its TTL.
    pub single_use: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            mode: TokenMode::Signed,
            secret: None,
            ttl: Duration::from_secs(90),
            single_use: false,
        }
    }
}

/// Upstream connection timeouts.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    /// TCP/TLS connect bound.
    pub connect_timeout: Duration,
    /// Bound on waiting for the upstream response head.
    pub response_timeout: Duration,
    /// Bound on each individual body read.
    pub read_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
        }
    }
}
