// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Log output shared by the binaries: JSON lines on stderr, filtered by
// RUST_LOG (default "info").

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Build the filter from `RUST_LOG`, falling back to `info` when it is unset
/// or unparseable.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global JSON subscriber. Call once, first thing in `main`.
pub fn init() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter())
        .init();
}
