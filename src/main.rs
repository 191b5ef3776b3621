// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tracing::error;

use honeytrap_mcp::config::HoneypotConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Loaded after the subscriber is installed so a warn-on-invalid-value
    // fallback (see `config::HoneypotConfig::load`) actually gets logged.
    let config = HoneypotConfig::load();

    if let Err(e) = honeytrap_mcp::run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
