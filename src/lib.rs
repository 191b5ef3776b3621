// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `honeytrap-mcp`: an MCP deception server. Offers a fake set of DevOps
//! tools over JSON-RPC, logs every interaction, and leaks traceable honey
//! tokens back at whoever calls them.

pub mod config;
pub mod db;
pub mod engagement;
pub mod error;
pub mod event_bus;
pub mod protocol;
pub mod rate_limit;
pub mod registry;
pub mod session;
pub mod simulators;
pub mod state;
pub mod tokens;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::HoneypotConfig;
use crate::db::Store;
use crate::state::AppState;
use crate::transport::build_router;

/// Run the honeypot server until shutdown.
pub async fn run(config: HoneypotConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let shutdown = CancellationToken::new();

    let store = Arc::new(Store::open(&config.db_path)?);
    let state = AppState::new(config, store, shutdown.clone());

    tracing::info!(%addr, "honeytrap-mcp listening");
    let router = build_router(state);
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}
