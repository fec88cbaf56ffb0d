//! Veil server - VLESS-over-WebSocket edge relay.
//!
//! Accepts websocket upgrades on `/ws` and `/vless`, authenticates each
//! connection against a single pre-shared identifier, and relays the
//! authenticated stream to the destination encoded in the handshake.

mod config;
mod pages;
mod relay;
mod session;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use config::ServerConfig;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use veil_core::ServerIdentity;

/// State shared by every session and page handler.
pub struct AppState {
    pub config: ServerConfig,
    pub identity: ServerIdentity,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    FmtSubscriber::builder()
        .with_max_level(if config.debug {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .with_target(true)
        .init();

    info!("Starting veil-server v{}", env!("CARGO_PKG_VERSION"));

    let identity = match config.uuid.as_deref() {
        Some(raw) => ServerIdentity::from_str(raw)?,
        None => {
            let identity = ServerIdentity::random();
            info!("No identifier configured, generated {}", identity);
            info!("Clients can fetch the current value from /uuid");
            identity
        }
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        identity,
    });

    let app = Router::new()
        .route("/", get(pages::index))
        .route("/config", get(pages::client_config))
        .route("/uuid", get(pages::uuid))
        .route("/debug", get(pages::debug))
        .route("/ws", get(session::websocket_handler))
        .route("/vless", get(session::websocket_handler))
        .fallback(get(pages::index))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}
