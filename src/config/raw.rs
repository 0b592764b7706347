// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML shapes, exactly as written in relay.yaml. Strings here are
// still uninterpolated and secrets are still bare.

use serde::Deserialize;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub relay: String,
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub generation: Option<RawGenerationConfig>,
    pub token: Option<RawTokenConfig>,
    pub upstream: Option<RawUpstreamConfig>,
    pub results_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGenerationConfig {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub max_sentences: Option<u32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTokenConfig {
    pub mode: Option<String>,
    pub secret: Option<String>,
    pub ttl_secs: Option<u64>,
    pub single_use: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUpstreamConfig {
    pub connect_timeout_ms: Option<u64>,
    pub response_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
}
