// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// OpenAI-compatible chat completions (OpenAI, OpenRouter, and friends):
// server-sent events, one JSON delta per `data:` line, `[DONE]` at the end.

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use serde_json::{json, Value};

use super::transport::HttpRequest;
use super::{upstream_error_message, Extraction, ProviderAdapter, ProviderError, UpstreamTarget};
use crate::reassembler::{FramingMode, FramingUnit};

const DONE_SENTINEL: &str = "[DONE]";

/// Adapter for `POST {base}/chat/completions` with `stream: true`.
///
/// Stream shape:
/// - `data: {"choices":[{"delta":{"content":"The sky"}}]}` -> fragment
/// - `data: {"choices":[{"delta":{},"finish_reason":"stop"}]}` -> nothing
/// - `data: [DONE]` -> done
#[derive(Debug, Clone)]
pub struct ChatCompletionsAdapter {
    target: UpstreamTarget,
}

impl ChatCompletionsAdapter {
    pub fn new(target: UpstreamTarget) -> Self {
        Self { target }
    }
}

impl ProviderAdapter for ChatCompletionsAdapter {
    fn name(&self) -> &'static str {
        "chat_completions"
    }

    fn build_request(&self, prompt: &str) -> HttpRequest {
        let target = &self.target;
        let body = json!({
            "model": target.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": true,
            "max_tokens": target.generation.max_output_tokens,
            "temperature": target.generation.temperature,
        });

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        // Keys with bytes a header cannot carry are sent without auth; the
        // upstream answers 401 and the stream ends empty.
        if let Ok(mut bearer) =
            HeaderValue::from_str(&format!("Bearer {}", target.api_key.expose()))
        {
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
        }

        HttpRequest {
            method: Method::POST,
            url: format!("{}/chat/completions", target.base_url),
            headers,
            body: Bytes::from(body.to_string()),
            timeout_ms: Some(target.response_timeout_ms()),
        }
    }

    fn framing(&self) -> FramingMode {
        FramingMode::SseLine
    }

    fn extract(&self, unit: &FramingUnit) -> Result<Extraction, ProviderError> {
        let FramingUnit::Data(payload) = unit else {
            return Err(ProviderError::UnexpectedUnit("json"));
        };

        if payload.trim() == DONE_SENTINEL {
            return Ok(Extraction {
                fragments: Vec::new(),
                done: true,
            });
        }

        let value: Value = serde_json::from_str(payload)
            .map_err(|e| ProviderError::MalformedPayload(e.to_string()))?;

        if let Some(message) = upstream_error_message(&value) {
            return Err(ProviderError::Upstream(message));
        }

        let fragments = value
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(|text| vec![text.to_string()])
            .unwrap_or_default();

        Ok(Extraction {
            fragments,
            done: false,
        })
    }
}
