// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stateful single-use handles.
//
// The token is a random 128-bit handle; query binding, context and expiry
// live in a process-wide map. Only usable when issuance and verification
// happen in the same process.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;
use std::time::Duration;

use super::{normalize_query, ttl_secs, AuthToken, HandshakeError, TokenAuthority};

const HANDLE_BYTES: usize = 16;

#[derive(Debug, Clone)]
struct HandleRecord {
    expires_at: DateTime<Utc>,
    query: String,
    context: String,
}

/// In-memory handle store backed by `DashMap` for concurrent access.
///
/// Expired records are swept lazily on every issue/verify call; no
/// background task is needed.
pub struct HandleTokenAuthority {
    records: DashMap<String, HandleRecord>,
    ttl: chrono::Duration,
}

impl HandleTokenAuthority {
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            ttl: chrono::Duration::seconds(ttl_secs(ttl)),
        }
    }

    /// Number of outstanding handles (for metrics/testing).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no handles are outstanding.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sweep(&self, now: DateTime<Utc>) {
        self.records.retain(|_, record| record.expires_at >= now);
    }

    fn fresh_handle() -> String {
        let mut bytes = [0u8; HANDLE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

impl TokenAuthority for HandleTokenAuthority {
    fn issue_at(
        &self,
        query: &str,
        context: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthToken, HandshakeError> {
        self.sweep(now);

        let handle = Self::fresh_handle();
        self.records.insert(
            handle.clone(),
            HandleRecord {
                expires_at: now + self.ttl,
                query: normalize_query(query),
                context: context.to_string(),
            },
        );
        Ok(AuthToken::new(handle))
    }

    fn verify_at(
        &self,
        token: &str,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<String, HandshakeError> {
        // Removal happens before any check: a handle is consumed by its
        // first presentation whether or not that presentation succeeds.
        let removed = self.records.remove(token);
        self.sweep(now);

        let Some((_, record)) = removed else {
            return Err(HandshakeError::UnknownHandle);
        };
        if now > record.expires_at {
            return Err(HandshakeError::Expired);
        }
        if record.query != normalize_query(query) {
            return Err(HandshakeError::QueryMismatch);
        }
        Ok(record.context)
    }
}
