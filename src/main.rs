// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use answer_relay::config;
use answer_relay::provider::{HttpSender, ReqwestHttpSender};
use answer_relay::relay;
use answer_relay::telemetry;
use clap::Parser;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "answer-relay", about = "Token-gated streaming relay for AI search answers")]
struct Cli {
    /// Path to the relay.yaml config file
    #[arg(long, default_value = "relay.yaml", env = "ANSWER_RELAY_CONFIG")]
    config: String,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "ANSWER_RELAY_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = relay::DEFAULT_PORT, env = "ANSWER_RELAY_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() {
    telemetry::init();

    let cli = Cli::parse();

    let addr = SocketAddr::new(cli.host, cli.port);
    tracing::info!(%addr, "answer-relay starting");

    let source = config::FileSource {
        path: std::path::PathBuf::from(cli.config),
    };
    let config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        version = %config.version,
        provider = %config.provider,
        model = %config.model,
        enabled = config.is_enabled(),
        token_mode = ?config.token.mode,
        ttl_secs = config.token.ttl.as_secs(),
        config_hash = %config.config_hash,
        "config loaded"
    );
    if !config.is_enabled() {
        tracing::warn!("no api_key configured; every stream request will be refused");
    }

    let http: Arc<dyn HttpSender> = match ReqwestHttpSender::from_config(&config.upstream) {
        Ok(sender) => Arc::new(sender),
        Err(e) => {
            tracing::error!("failed to build upstream client: {e}");
            std::process::exit(1);
        }
    };

    let app = relay::build_router(relay::AppState::from_config(&config, http));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "answer-relay listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
