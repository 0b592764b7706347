// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads relay.yaml, resolves variable interpolation, applies provider
// defaults, validates tuning knobs, and computes a deterministic config hash.

mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::{compute_hash, load_config};
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{Config, GenerationConfig, Secret, TokenConfig, TokenMode, UpstreamConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;
    use std::sync::Mutex;
    use std::time::Duration;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(name: &str, value: Option<&str>, f: F) {
        let _guard = ENV_MUTEX.lock().unwrap();
        let previous = std::env::var(name).ok();
        match value {
            Some(v) => std::env::set_var(name, v),
            None => std::env::remove_var(name),
        }
        f();
        match previous {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }

    /// The shipped relay.yaml, inlined so tests do not depend on filesystem
    /// layout.
    const EXAMPLE_YAML: &str = r#"relay: v1

provider: gemini
api_key: "${ANSWER_RELAY_TEST_KEY:-}"
model: gemini-1.5-flash

generation:
  max_output_tokens: 400
  temperature: 0.3
  max_sentences: 4

token:
  mode: signed
  ttl_secs: 90

upstream:
  connect_timeout_ms: 5000
  read_timeout_ms: 30000

results_limit: 6
"#;

    fn make_source(yaml: &str) -> StringSource {
        StringSource {
            content: yaml.to_string(),
        }
    }

    // ---------------------------------------------------------------
    // 1. Valid config parses into typed struct -- check key fields
    // ---------------------------------------------------------------

    #[test]
    fn valid_config_parses_all_key_fields() {
        with_env("ANSWER_RELAY_TEST_KEY", Some("k-123"), || {
            let config = load_config(&make_source(EXAMPLE_YAML)).unwrap();

            assert_eq!(config.version, "v1");
            assert_eq!(config.provider, ProviderKind::Gemini);
            assert_eq!(config.api_key.as_ref().map(|k| k.expose()), Some("k-123"));
            assert_eq!(config.model, "gemini-1.5-flash");
            assert_eq!(config.base_url, "https://generativelanguage.googleapis.com");
            assert_eq!(config.generation.max_output_tokens, 400);
            assert!((config.generation.temperature - 0.3).abs() < f32::EPSILON);
            assert_eq!(config.token.mode, TokenMode::Signed);
            assert_eq!(config.token.ttl, Duration::from_secs(90));
            assert_eq!(config.upstream.connect_timeout, Duration::from_millis(5000));
            assert_eq!(config.upstream.response_timeout, Duration::from_secs(30));
            assert_eq!(config.results_limit, 6);
            assert!(config.is_enabled());
        });
    }

    // ---------------------------------------------------------------
    // 2. Missing API key leaves the feature inert, not a load error
    // ---------------------------------------------------------------

    #[test]
    fn unset_api_key_disables_feature() {
        with_env("ANSWER_RELAY_TEST_KEY", None, || {
            let config = load_config(&make_source(EXAMPLE_YAML)).unwrap();
            assert!(config.api_key.is_none());
            assert!(!config.is_enabled());
        });
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = load_config(&make_source("relay: v1\n")).unwrap();
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.generation, GenerationConfig::default());
        assert_eq!(config.upstream, UpstreamConfig::default());
        assert_eq!(config.token.ttl, Duration::from_secs(90));
        assert!(!config.token.single_use);
        assert!(!config.is_enabled());
    }

    // ---------------------------------------------------------------
    // 3. Provider selection applies per-provider defaults
    // ---------------------------------------------------------------

    #[test]
    fn openrouter_provider_selects_chat_completions() {
        let yaml = "relay: v1\nprovider: openrouter\napi_key: sk-or\n";
        let config = load_config(&make_source(yaml)).unwrap();
        assert_eq!(config.provider, ProviderKind::ChatCompletions);
        assert_eq!(config.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.model, "openrouter/auto");
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let yaml = "relay: v1\nprovider: openai\nbase_url: \"http://127.0.0.1:8080/v1/\"\n";
        let config = load_config(&make_source(yaml)).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080/v1");
    }

    #[test]
    fn unknown_provider_rejected() {
        let yaml = "relay: v1\nprovider: cohere\n";
        let err = load_config(&make_source(yaml)).unwrap_err();
        assert!(err.to_string().contains("unknown provider"), "{err}");
    }

    // ---------------------------------------------------------------
    // 4. Validation of tuning knobs
    // ---------------------------------------------------------------

    #[test]
    fn unsupported_version_rejected() {
        let err = load_config(&make_source("relay: v2\n")).unwrap_err();
        assert!(err.to_string().contains("unsupported config version"));
    }

    #[test]
    fn temperature_out_of_range_rejected() {
        let yaml = "relay: v1\ngeneration:\n  temperature: 3.5\n";
        let err = load_config(&make_source(yaml)).unwrap_err();
        assert!(err.to_string().contains("temperature"), "{err}");
    }

    #[test]
    fn zero_ttl_rejected() {
        let yaml = "relay: v1\ntoken:\n  ttl_secs: 0\n";
        let err = load_config(&make_source(yaml)).unwrap_err();
        assert!(err.to_string().contains("ttl_secs"), "{err}");
    }

    #[test]
    fn unknown_token_mode_rejected() {
        let yaml = "relay: v1\ntoken:\n  mode: jwt\n";
        let err = load_config(&make_source(yaml)).unwrap_err();
        assert!(err.to_string().contains("unknown token mode"), "{err}");
    }

    #[test]
    fn handle_mode_and_single_use_parsed() {
        let yaml = "relay: v1\ntoken:\n  mode: handle\n  single_use: true\n  secret: s3cret\n";
        let config = load_config(&make_source(yaml)).unwrap();
        assert_eq!(config.token.mode, TokenMode::Handle);
        assert!(config.token.single_use);
        assert_eq!(config.token.secret.as_ref().map(|s| s.expose()), Some("s3cret"));
    }

    #[test]
    fn zero_read_timeout_rejected() {
        let yaml = "relay: v1\nupstream:\n  read_timeout_ms: 0\n";
        let err = load_config(&make_source(yaml)).unwrap_err();
        assert!(err.to_string().contains("read_timeout_ms"), "{err}");
    }

    #[test]
    fn unknown_field_rejected() {
        let yaml = "relay: v1\napi_kye: typo\n";
        assert!(load_config(&make_source(yaml)).is_err());
    }

    #[test]
    fn undefined_variable_without_fallback_fails() {
        with_env("ANSWER_RELAY_TEST_MODEL", None, || {
            let yaml = "relay: v1\nmodel: \"${ANSWER_RELAY_TEST_MODEL}\"\n";
            let err = load_config(&make_source(yaml)).unwrap_err();
            assert!(err.to_string().contains("ANSWER_RELAY_TEST_MODEL"));
        });
    }

    // ---------------------------------------------------------------
    // 5. Hash and secrecy
    // ---------------------------------------------------------------

    #[test]
    fn config_hash_is_deterministic() {
        let a = load_config(&make_source("relay: v1\n")).unwrap();
        let b = load_config(&make_source("relay: v1\n")).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
        assert!(a.config_hash.starts_with("sha256:"));

        let c = load_config(&make_source("relay: v1\nresults_limit: 5\n")).unwrap();
        assert_ne!(a.config_hash, c.config_hash);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let yaml = "relay: v1\napi_key: super-secret-key\n";
        let config = load_config(&make_source(yaml)).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let source = FileSource {
            path: std::path::PathBuf::from("/nonexistent/answer-relay/relay.yaml"),
        };
        let err = load_config(&source).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/answer-relay/relay.yaml"));
    }
}
