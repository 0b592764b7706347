// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

/// Everything that stops a relay config from loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {origin}: {source}")]
    Read {
        origin: String,
        source: std::io::Error,
    },

    #[error("relay config is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid relay config: {0}")]
    Validation(String),

    #[error("config references ${{{name}}} but it is not set in the environment")]
    UndefinedVariable { name: String },
}
