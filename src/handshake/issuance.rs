// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Page-side issuance: fold ranked search snippets into a context string and
// mint a credential over it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{HandshakeError, TokenAuthority};

/// One ranked search result as supplied by the search page.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// What the page embeds: the token and the context it was minted over.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IssuedCredential {
    pub token: String,
    /// Standard base64 of the context, safe to drop into an HTML attribute.
    pub encoded_context: String,
}

/// Format up to `limit` results as numbered `"[i] title: content"` lines.
pub fn format_context(results: &[SearchResult], limit: usize) -> String {
    results
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, result)| {
            format!(
                "[{}] {}: {}",
                i + 1,
                collapse(&result.title),
                collapse(&result.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Mint a credential for `query` over the top `limit` results.
pub fn issue_for_results(
    authority: &dyn TokenAuthority,
    query: &str,
    results: &[SearchResult],
    limit: usize,
) -> Result<IssuedCredential, HandshakeError> {
    let context = format_context(results, limit);
    let token = authority.issue(query, &context)?;
    Ok(IssuedCredential {
        token: token.into_string(),
        encoded_context: STANDARD.encode(context.as_bytes()),
    })
}

// Snippets keep one result per line.
fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
