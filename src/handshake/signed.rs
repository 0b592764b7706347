// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stateless signed tokens.
//
// Wire form: "{issued_at}.{context_b64}.{signature_b64}" where the signature
// is HMAC-SHA256 over "{issued_at}\n{normalized_query}\n{context_b64}".
// Both base64 segments use the URL-safe alphabet without padding, so the
// token never contains '.' inside a segment.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::time::Duration;

use super::{normalize_query, ttl_secs, AuthToken, HandshakeError, TokenAuthority};

type HmacSha256 = Hmac<Sha256>;

/// Tolerated clock difference between the issuing and verifying worker.
const MAX_CLOCK_SKEW_SECS: i64 = 5;

/// Domain separator for secrets derived from the provider API key.
const SECRET_DERIVATION_LABEL: &str = "answer-relay/token-secret/v1\n";

/// Derive a signing secret from the provider API key.
///
/// Deterministic, so every worker process that sees the same key derives the
/// same secret without sharing state.
pub fn derive_secret(api_key: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(SECRET_DERIVATION_LABEL.as_bytes());
    hasher.update(api_key.as_bytes());
    hasher.finalize().to_vec()
}

/// HMAC-signed, expiring, query-bound tokens with the context embedded.
pub struct SignedTokenAuthority {
    mac: HmacSha256,
    ttl_secs: i64,
    /// Signatures already accepted, with the instant they stop mattering.
    /// Only present when single-use enforcement is enabled.
    seen: Option<DashMap<String, i64>>,
}

impl SignedTokenAuthority {
    pub fn new(secret: &[u8], ttl: Duration, single_use: bool) -> Self {
        let mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
        Self {
            mac,
            ttl_secs: ttl_secs(ttl),
            seen: single_use.then(DashMap::new),
        }
    }

    fn signer(&self, issued_at: i64, normalized_query: &str, context_b64: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(issued_at.to_string().as_bytes());
        mac.update(b"\n");
        mac.update(normalized_query.as_bytes());
        mac.update(b"\n");
        mac.update(context_b64.as_bytes());
        mac
    }

    /// Record an accepted signature; a second sighting is a replay.
    fn claim(&self, signature: &str, issued_at: i64, now: i64) -> Result<(), HandshakeError> {
        let Some(seen) = &self.seen else {
            return Ok(());
        };

        // Lazy sweep: entries past their expiry can never match a valid token.
        seen.retain(|_, expires_at| *expires_at >= now);

        match seen.entry(signature.to_string()) {
            Entry::Occupied(_) => Err(HandshakeError::Replayed),
            Entry::Vacant(slot) => {
                slot.insert(issued_at.saturating_add(self.ttl_secs));
                Ok(())
            }
        }
    }

    /// Number of signatures held by the replay guard (for tests/metrics).
    pub fn tracked_signatures(&self) -> usize {
        self.seen.as_ref().map_or(0, DashMap::len)
    }
}

impl TokenAuthority for SignedTokenAuthority {
    fn issue_at(
        &self,
        query: &str,
        context: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthToken, HandshakeError> {
        let issued_at = now.timestamp();
        let context_b64 = URL_SAFE_NO_PAD.encode(context.as_bytes());
        let signature = self
            .signer(issued_at, &normalize_query(query), &context_b64)
            .finalize()
            .into_bytes();

        Ok(AuthToken::new(format!(
            "{issued_at}.{context_b64}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        )))
    }

    fn verify_at(
        &self,
        token: &str,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<String, HandshakeError> {
        let mut parts = token.split('.');
        let (Some(issued_at), Some(context_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(HandshakeError::Malformed);
        };

        let issued_at: i64 = issued_at.parse().map_err(|_| HandshakeError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| HandshakeError::Malformed)?;

        // Constant-time comparison inside verify_slice.
        self.signer(issued_at, &normalize_query(query), context_b64)
            .verify_slice(&signature)
            .map_err(|_| HandshakeError::BadSignature)?;

        let now = now.timestamp();
        let age = now.saturating_sub(issued_at);
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(HandshakeError::NotYetValid);
        }
        if age > self.ttl_secs {
            return Err(HandshakeError::Expired);
        }

        let context = URL_SAFE_NO_PAD
            .decode(context_b64)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(HandshakeError::Malformed)?;

        self.claim(signature_b64, issued_at, now)?;

        Ok(context)
    }
}
