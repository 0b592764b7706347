// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// relay-issue: mint a stream credential by hand.
//
// Usage:
//   relay-issue --query "why is the sky blue" --results results.json
//   cat results.json | relay-issue --query "why is the sky blue" --results -
//
// `results.json` is an array of {"title": ..., "content": ...} in rank order.
// Prints {"token": ..., "encoded_context": ...} on stdout.

use std::io::Read as _;

use clap::Parser;

use answer_relay::config;
use answer_relay::handshake::{build_authority, issue_for_results, SearchResult};
use answer_relay::telemetry;

#[derive(Parser)]
#[command(
    name = "relay-issue",
    about = "Mint a token for the answer relay from the same config it runs with."
)]
struct Cli {
    /// Path to the relay.yaml config file
    #[arg(long, default_value = "relay.yaml", env = "ANSWER_RELAY_CONFIG")]
    config: String,

    /// Query the token is bound to
    #[arg(long)]
    query: String,

    /// JSON file of ranked search results ("-" reads stdin). Omit for an
    /// empty context.
    #[arg(long, value_name = "PATH")]
    results: Option<String>,

    /// How many results go into the context (default: config results_limit)
    #[arg(long)]
    limit: Option<usize>,
}

fn read_results(path: &str) -> Result<Vec<SearchResult>, String> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))?
    };
    serde_json::from_str(&raw).map_err(|e| format!("results are not a JSON array of results: {e}"))
}

fn main() {
    telemetry::init();

    let cli = Cli::parse();

    let source = config::FileSource {
        path: std::path::PathBuf::from(&cli.config),
    };
    let config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let results = match cli.results.as_deref().map(read_results).transpose() {
        Ok(results) => results.unwrap_or_default(),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    if config.token.mode == config::TokenMode::Handle {
        tracing::warn!("handle tokens only verify inside the process that issued them");
    }

    let limit = cli.limit.unwrap_or(config.results_limit);
    let authority = build_authority(&config);

    let issued = match issue_for_results(authority.as_ref(), &cli.query, &results, limit) {
        Ok(issued) => issued,
        Err(e) => {
            tracing::error!(reason = e.reason(), "failed to issue token: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&issued) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("failed to encode credential: {e}");
            std::process::exit(1);
        }
    }
}
