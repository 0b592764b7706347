// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Token handshake
//
// Mints and verifies short-lived credentials that authorize exactly one
// answer stream for one query:
// - SignedTokenAuthority: stateless HMAC-SHA256 tokens, verifiable by any
//   worker that shares (or derives) the same secret
// - HandleTokenAuthority: random single-use handles in a process-wide map
// - DisabledAuthority: rejects everything when no API key is configured

mod handle;
mod issuance;
mod signed;

pub use handle::HandleTokenAuthority;
pub use issuance::{format_context, issue_for_results, IssuedCredential, SearchResult};
pub use signed::{derive_secret, SignedTokenAuthority};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization;

use crate::config::{Config, TokenMode};

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Opaque credential handed to the browser and presented back on the stream
/// request. Bearer material: never log it.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Why a credential was refused. Every variant maps to one HTTP 401; the
/// distinction only shows up in logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token issued in the future")]
    NotYetValid,

    #[error("token already used")]
    Replayed,

    #[error("unknown token handle")]
    UnknownHandle,

    #[error("token was issued for a different query")]
    QueryMismatch,

    #[error("handshake disabled: no API key configured")]
    Disabled,
}

impl HandshakeError {
    /// Stable label for structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            HandshakeError::Malformed => "malformed",
            HandshakeError::BadSignature => "bad_signature",
            HandshakeError::Expired => "expired",
            HandshakeError::NotYetValid => "not_yet_valid",
            HandshakeError::Replayed => "replayed",
            HandshakeError::UnknownHandle => "unknown_handle",
            HandshakeError::QueryMismatch => "query_mismatch",
            HandshakeError::Disabled => "disabled",
        }
    }
}

// ---------------------------------------------------------------------------
// Trait: TokenAuthority
// ---------------------------------------------------------------------------

/// Issues and verifies stream credentials.
///
/// Implementations must be Send + Sync; one instance is shared by every
/// request handler via `Arc`. The `_at` methods take the current time
/// explicitly so expiry can be tested at exact boundaries.
pub trait TokenAuthority: Send + Sync {
    /// Mint a credential binding `query` and carrying `context`.
    fn issue_at(
        &self,
        query: &str,
        context: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthToken, HandshakeError>;

    /// Check a presented credential against `query` and return the context
    /// it was issued with.
    fn verify_at(
        &self,
        token: &str,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<String, HandshakeError>;

    fn issue(&self, query: &str, context: &str) -> Result<AuthToken, HandshakeError> {
        self.issue_at(query, context, Utc::now())
    }

    fn verify(&self, token: &str, query: &str) -> Result<String, HandshakeError> {
        self.verify_at(token, query, Utc::now())
    }
}

/// Authority used when the relay has no API key: nothing is ever issued or
/// accepted.
pub struct DisabledAuthority;

impl TokenAuthority for DisabledAuthority {
    fn issue_at(&self, _: &str, _: &str, _: DateTime<Utc>) -> Result<AuthToken, HandshakeError> {
        Err(HandshakeError::Disabled)
    }

    fn verify_at(&self, _: &str, _: &str, _: DateTime<Utc>) -> Result<String, HandshakeError> {
        Err(HandshakeError::Disabled)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Canonical form of a query for binding: NFKC, lowercased, whitespace runs
/// collapsed to one space, trimmed.
pub fn normalize_query(query: &str) -> String {
    let folded: String = query.nfkc().collect();
    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Build the authority selected by config. Chosen once at start-up.
pub fn build_authority(config: &Config) -> Arc<dyn TokenAuthority> {
    let Some(api_key) = &config.api_key else {
        return Arc::new(DisabledAuthority);
    };

    match config.token.mode {
        TokenMode::Signed => {
            let secret = match &config.token.secret {
                Some(secret) => secret.expose().as_bytes().to_vec(),
                None => derive_secret(api_key.expose()),
            };
            Arc::new(SignedTokenAuthority::new(
                &secret,
                config.token.ttl,
                config.token.single_use,
            ))
        }
        TokenMode::Handle => Arc::new(HandleTokenAuthority::new(config.token.ttl)),
    }
}

/// TTL as whole seconds for timestamp arithmetic.
pub(crate) fn ttl_secs(ttl: std::time::Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}
