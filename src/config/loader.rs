// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::provider::ProviderKind;

use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Longest accepted credential lifetime.
const MAX_TTL_SECS: u64 = 3600;

/// Most search results that may be folded into one prompt.
const MAX_RESULTS_LIMIT: usize = 20;

/// Load and validate a relay config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Compute SHA256 config hash
/// 3. Parse YAML into raw deserialization types
/// 4. Resolve variable interpolation in string fields
/// 5. Apply provider-specific defaults
/// 6. Validate numeric ranges
/// 7. Build typed Config struct
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let config_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.relay != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.relay
        )));
    }

    let provider_name = raw.provider.as_deref().unwrap_or("gemini");
    let (provider, default_base_url, default_model) = provider_defaults(provider_name)?;

    let api_key = resolve_optional(raw.api_key.as_deref())?.map(Secret::new);

    let model = resolve_optional(raw.model.as_deref())?
        .unwrap_or_else(|| default_model.to_string());

    let base_url = resolve_optional(raw.base_url.as_deref())?
        .unwrap_or_else(|| default_base_url.to_string())
        .trim_end_matches('/')
        .to_string();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "base_url must start with http:// or https://, got \"{base_url}\""
        )));
    }

    let generation = build_generation_config(raw.generation)?;
    let token = build_token_config(raw.token)?;
    let upstream = build_upstream_config(raw.upstream)?;

    let results_limit = raw.results_limit.unwrap_or(6);
    if !(1..=MAX_RESULTS_LIMIT).contains(&results_limit) {
        return Err(ConfigError::Validation(format!(
            "results_limit must be in [1, {MAX_RESULTS_LIMIT}], got {results_limit}"
        )));
    }

    Ok(Config {
        version: raw.relay,
        provider,
        api_key,
        model,
        base_url,
        generation,
        token,
        upstream,
        results_limit,
        config_hash,
    })
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

/// Map a provider name to its wire format plus default base URL and model.
fn provider_defaults(
    name: &str,
) -> Result<(ProviderKind, &'static str, &'static str), ConfigError> {
    match name {
        "gemini" => Ok((
            ProviderKind::Gemini,
            "https://generativelanguage.googleapis.com",
            "gemini-1.5-flash",
        )),
        "openrouter" => Ok((
            ProviderKind::ChatCompletions,
            "https://openrouter.ai/api/v1",
            "openrouter/auto",
        )),
        "openai" => Ok((
            ProviderKind::ChatCompletions,
            "https://api.openai.com/v1",
            "gpt-4o-mini",
        )),
        other => Err(ConfigError::Validation(format!(
            "unknown provider \"{other}\", expected \"gemini\", \"openrouter\", or \"openai\""
        ))),
    }
}

/// Interpolate an optional string field. Blank results count as absent.
fn resolve_optional(value: Option<&str>) -> Result<Option<String>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let resolved = resolve_variables(value)?;
    let trimmed = resolved.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn build_generation_config(
    raw: Option<raw::RawGenerationConfig>,
) -> Result<GenerationConfig, ConfigError> {
    let defaults = GenerationConfig::default();
    let Some(raw) = raw else {
        return Ok(defaults);
    };

    let max_output_tokens = raw.max_output_tokens.unwrap_or(defaults.max_output_tokens);
    if max_output_tokens == 0 {
        return Err(ConfigError::Validation(
            "generation.max_output_tokens must be > 0".into(),
        ));
    }

    let temperature = raw.temperature.unwrap_or(defaults.temperature);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::Validation(format!(
            "generation.temperature must be in [0.0, 2.0], got {temperature}"
        )));
    }

    let max_sentences = raw.max_sentences.unwrap_or(defaults.max_sentences);
    if max_sentences == 0 {
        return Err(ConfigError::Validation(
            "generation.max_sentences must be >= 1".into(),
        ));
    }

    Ok(GenerationConfig {
        max_output_tokens,
        temperature,
        max_sentences,
    })
}

fn build_token_config(raw: Option<raw::RawTokenConfig>) -> Result<TokenConfig, ConfigError> {
    let defaults = TokenConfig::default();
    let Some(raw) = raw else {
        return Ok(defaults);
    };

    let mode = match raw.mode.as_deref() {
        Some("signed") | None => TokenMode::Signed,
        Some("handle") => TokenMode::Handle,
        Some(other) => {
            return Err(ConfigError::Validation(format!(
                "unknown token mode \"{other}\", expected \"signed\" or \"handle\""
            )));
        }
    };

    let ttl_secs = raw.ttl_secs.unwrap_or(defaults.ttl.as_secs());
    if !(1..=MAX_TTL_SECS).contains(&ttl_secs) {
        return Err(ConfigError::Validation(format!(
            "token.ttl_secs must be in [1, {MAX_TTL_SECS}], got {ttl_secs}"
        )));
    }

    let secret = resolve_optional(raw.secret.as_deref())?.map(Secret::new);

    Ok(TokenConfig {
        mode,
        secret,
        ttl: Duration::from_secs(ttl_secs),
        single_use: raw.single_use.unwrap_or(defaults.single_use),
    })
}

fn build_upstream_config(
    raw: Option<raw::RawUpstreamConfig>,
) -> Result<UpstreamConfig, ConfigError> {
    let defaults = UpstreamConfig::default();
    let Some(raw) = raw else {
        return Ok(defaults);
    };

    fn positive_ms(
        name: &str,
        value: Option<u64>,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        match value {
            None => Ok(default),
            Some(0) => Err(ConfigError::Validation(format!(
                "upstream.{name} must be > 0"
            ))),
            Some(ms) => Ok(Duration::from_millis(ms)),
        }
    }

    Ok(UpstreamConfig {
        connect_timeout: positive_ms(
            "connect_timeout_ms",
            raw.connect_timeout_ms,
            defaults.connect_timeout,
        )?,
        response_timeout: positive_ms(
            "response_timeout_ms",
            raw.response_timeout_ms,
            defaults.response_timeout,
        )?,
        read_timeout: positive_ms("read_timeout_ms", raw.read_timeout_ms, defaults.read_timeout)?,
    })
}
