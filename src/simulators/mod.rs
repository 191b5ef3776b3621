// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tool fake command handlers exposed to MCP clients as `tools/call`
//! targets. Each simulator owns a slice of the fabricated environment and
//! mints honey tokens where the real system would expose secrets.

mod aws_cli;
mod browser;
mod dns_lookup;
mod docker_registry;
mod file_read;
mod kubectl;
mod nmap;
mod shell_exec;
mod sqlmap;
mod vault_cli;

use indexmap::IndexMap;
use serde_json::Value;

use crate::db::Store;
use crate::session::SessionContext;
use crate::tokens::{self, TokenType};

/// Outcome of a single simulated tool invocation.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub output: String,
    pub is_error: bool,
    pub escalation_delta: i64,
}

impl SimulationResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { output: output.into(), is_error: false, escalation_delta: 0 }
    }

    pub fn ok_escalating(output: impl Into<String>, escalation_delta: i64) -> Self {
        Self { output: output.into(), is_error: false, escalation_delta }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self { output: output.into(), is_error: true, escalation_delta: 0 }
    }
}

/// A fake command or API surface offered to an attacker via `tools/call`.
pub trait ToolSimulator: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;

    /// Run the simulated tool. `store` is the blocking persistence handle,
    /// used to log any honey tokens minted during this call.
    fn simulate(
        &self,
        arguments: &Value,
        session: &mut SessionContext,
        store: &Store,
    ) -> anyhow::Result<SimulationResult>;

    fn to_mcp_tool(&self) -> Value {
        serde_json::json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

/// Mint a honey token, log it, and tag it onto the session's discovered
/// credentials in one step. Shared by every simulator that exposes secrets.
fn inject_token(
    store: &Store,
    session: &mut SessionContext,
    token_type: TokenType,
    context: &str,
) -> anyhow::Result<String> {
    let token_value = tokens::generate(token_type, &session.session_id);
    // interaction_id is unknown at mint time; the registry's log_interaction
    // call happens after simulate() returns.
    store.log_honey_token(&session.session_id, token_type.as_str(), &token_value, context, None)?;
    session.add_credential(format!("{}:{context}", token_type.as_str()));
    Ok(token_value)
}

fn arg_str<'a>(arguments: &'a Value, key: &str, default: &'a str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Build the full set of simulators, keyed by their MCP tool name, in
/// insertion order so `tools/list` output is stable.
pub fn build_registry() -> IndexMap<&'static str, Box<dyn ToolSimulator>> {
    let simulators: Vec<Box<dyn ToolSimulator>> = vec![
        Box::new(nmap::NmapSimulator),
        Box::new(dns_lookup::DnsLookupSimulator),
        Box::new(file_read::FileReadSimulator),
        Box::new(shell_exec::ShellExecSimulator),
        Box::new(sqlmap::SqlmapSimulator),
        Box::new(vault_cli::VaultCliSimulator),
        Box::new(aws_cli::AwsCliSimulator),
        Box::new(kubectl::KubectlSimulator),
        Box::new(docker_registry::DockerRegistrySimulator),
        Box::new(browser::BrowserSimulator),
    ];

    let mut registry = IndexMap::new();
    for sim in simulators {
        registry.insert(sim.name(), sim);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_ten_simulators_with_unique_names() {
        let registry = build_registry();
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn test_every_simulator_schema_is_an_object() {
        for sim in build_registry().values() {
            assert_eq!(sim.input_schema().get("type").and_then(Value::as_str), Some("object"));
        }
    }
}
