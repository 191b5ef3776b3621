// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use std::time::Duration;

pub const SERVER_NAME: &str = "internal-devops-tools";
pub const SERVER_VERSION: &str = "2.4.1";
pub const PROTOCOL_VERSION: &str = "2025-11-25";

/// Raw CLI/env surface. Integer fields are read as strings so a malformed
/// value never aborts startup through clap's own value parser — `load()`
/// parses them itself and falls back to the default with a warning.
#[derive(Debug, Clone, clap::Parser)]
#[command(version, about = "MCP deception server exposing fake DevOps tools")]
struct RawHoneypotConfig {
    /// Path to the SQLite database file.
    #[arg(long, default_value = "honeypot.db", env = "HONEYPOT_DB_PATH")]
    db_path: std::path::PathBuf,

    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "HONEYPOT_HOST")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value = "5000", env = "HONEYPOT_PORT")]
    port: String,

    /// Enable verbose debug logging.
    #[arg(long, default_value_t = false, env = "HONEYPOT_DEBUG")]
    debug: bool,

    /// Session idle time-to-live in seconds before cache eviction.
    #[arg(long, default_value = "3600", env = "HONEYPOT_SESSION_TTL")]
    session_ttl_secs: String,

    /// Bearer key required to access the dashboard read API. Unset disables auth.
    #[arg(long, env = "DASHBOARD_API_KEY")]
    dashboard_api_key: Option<String>,

    /// Origin allowed to read cross-origin responses via CORS. Unset means no
    /// origin is echoed back (same-origin only).
    #[arg(long, env = "HONEYPOT_ALLOWED_ORIGIN")]
    allowed_origin: Option<String>,

    /// Max MCP requests allowed per rate-limit window, per session/address.
    #[arg(long, default_value = "60", env = "HONEYPOT_MCP_RATE_LIMIT")]
    mcp_rate_limit: String,

    /// MCP rate-limit window, in seconds.
    #[arg(long, default_value = "60", env = "HONEYPOT_MCP_RATE_WINDOW_SECS")]
    mcp_rate_window_secs: String,

    /// Max dashboard API requests allowed per rate-limit window, per address.
    #[arg(long, default_value = "120", env = "HONEYPOT_DASHBOARD_RATE_LIMIT")]
    dashboard_rate_limit: String,

    /// Dashboard rate-limit window, in seconds.
    #[arg(long, default_value = "60", env = "HONEYPOT_DASHBOARD_RATE_WINDOW_SECS")]
    dashboard_rate_window_secs: String,
}

/// Configuration for the honeypot server.
#[derive(Debug, Clone)]
pub struct HoneypotConfig {
    pub db_path: std::path::PathBuf,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub session_ttl_secs: u64,
    pub dashboard_api_key: Option<String>,
    pub allowed_origin: Option<String>,
    pub mcp_rate_limit: u32,
    pub mcp_rate_window_secs: u64,
    pub dashboard_rate_limit: u32,
    pub dashboard_rate_window_secs: u64,
}

/// Parse `raw` as `T`, logging a warning and falling back to `default` on
/// failure rather than aborting startup.
fn parse_or_warn<T>(raw: &str, field: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match raw.parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(field, value = raw, default = %default, "invalid integer config value, using default");
            default
        }
    }
}

impl HoneypotConfig {
    /// Parse CLI args/env into a `HoneypotConfig`. Invalid integer values
    /// warn and fall back to their default instead of aborting the process;
    /// `--help`/`--version` and genuinely malformed CLI invocations still
    /// exit through clap as usual.
    pub fn load() -> Self {
        let raw = RawHoneypotConfig::parse();
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawHoneypotConfig) -> Self {
        Self {
            db_path: raw.db_path,
            host: raw.host,
            port: parse_or_warn(&raw.port, "port", 5000u16),
            debug: raw.debug,
            session_ttl_secs: parse_or_warn(&raw.session_ttl_secs, "session_ttl_secs", 3600u64),
            dashboard_api_key: raw.dashboard_api_key,
            allowed_origin: raw.allowed_origin,
            mcp_rate_limit: parse_or_warn(&raw.mcp_rate_limit, "mcp_rate_limit", 60u32),
            mcp_rate_window_secs: parse_or_warn(&raw.mcp_rate_window_secs, "mcp_rate_window_secs", 60u64),
            dashboard_rate_limit: parse_or_warn(&raw.dashboard_rate_limit, "dashboard_rate_limit", 120u32),
            dashboard_rate_window_secs: parse_or_warn(
                &raw.dashboard_rate_window_secs,
                "dashboard_rate_window_secs",
                60u64,
            ),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn mcp_rate_window(&self) -> Duration {
        Duration::from_secs(self.mcp_rate_window_secs)
    }

    pub fn dashboard_rate_window(&self) -> Duration {
        Duration::from_secs(self.dashboard_rate_window_secs)
    }

    /// A config with defaults suitable for tests: in-memory DB path, no auth.
    pub fn for_test() -> Self {
        Self {
            db_path: std::path::PathBuf::from(":memory:"),
            host: "127.0.0.1".to_owned(),
            port: 0,
            debug: false,
            session_ttl_secs: 3600,
            dashboard_api_key: None,
            allowed_origin: None,
            mcp_rate_limit: 60,
            mcp_rate_window_secs: 60,
            dashboard_rate_limit: 120,
            dashboard_rate_window_secs: 60,
        }
    }
}
