// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Gemini `streamGenerateContent`: the body is one JSON array delivered a few
// objects at a time, so framing is balanced-brace.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use serde_json::{json, Value};

use super::transport::HttpRequest;
use super::{upstream_error_message, Extraction, ProviderAdapter, ProviderError, UpstreamTarget};
use crate::reassembler::{FramingMode, FramingUnit};

/// Adapter for the Gemini generative language API.
///
/// Stream shape:
/// ```json
/// [{"candidates": [{"content": {"parts": [{"text": "The sky"}], "role": "model"}}]},
/// {"candidates": [{"content": {"parts": [{"text": " is blue."}]}, "finishReason": "STOP"}]}]
/// ```
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    target: UpstreamTarget,
}

impl GeminiAdapter {
    pub fn new(target: UpstreamTarget) -> Self {
        Self { target }
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn build_request(&self, prompt: &str) -> HttpRequest {
        let target = &self.target;
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?key={}",
            target.base_url,
            target.model,
            target.api_key.expose()
        );

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "maxOutputTokens": target.generation.max_output_tokens,
                "temperature": target.generation.temperature,
            },
        });

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        HttpRequest {
            method: Method::POST,
            url,
            headers,
            body: Bytes::from(body.to_string()),
            timeout_ms: Some(target.response_timeout_ms()),
        }
    }

    fn framing(&self) -> FramingMode {
        FramingMode::BraceJson
    }

    fn extract(&self, unit: &FramingUnit) -> Result<Extraction, ProviderError> {
        let FramingUnit::Json(value) = unit else {
            return Err(ProviderError::UnexpectedUnit("data"));
        };

        if let Some(message) = upstream_error_message(value) {
            return Err(ProviderError::Upstream(message));
        }

        // Missing candidates or parts (safety blocks, usage-only tails) carry
        // no text; that is not an error.
        let fragments = value
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Extraction {
            fragments,
            done: false,
        })
    }
}
