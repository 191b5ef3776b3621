// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool registry: holds the simulator set and runs the dispatch transaction
//! that ties a `tools/call` invocation to session state, honey-token
//! logging, engagement enrichment, and live-event publication.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::db::Store;
use crate::engagement;
use crate::event_bus::EventBus;
use crate::session::SessionManager;
use crate::simulators::{self, ToolSimulator};

/// Result of a `tools/call` dispatch, already enriched and logged.
pub struct ToolCallOutcome {
    pub output: String,
    pub is_error: bool,
}

impl ToolCallOutcome {
    fn error(output: impl Into<String>) -> Self {
        Self { output: output.into(), is_error: true }
    }
}

pub struct ToolRegistry {
    tools: IndexMap<&'static str, Box<dyn ToolSimulator>>,
    store: Arc<Store>,
    sessions: Arc<SessionManager>,
    bus: Arc<EventBus>,
}

impl ToolRegistry {
    pub fn new(store: Arc<Store>, sessions: Arc<SessionManager>, bus: Arc<EventBus>) -> Self {
        Self { tools: simulators::build_registry(), store, sessions, bus }
    }

    /// MCP tool descriptors for `tools/list`, in registration order.
    pub fn list_tools(&self) -> Vec<Value> {
        self.tools.values().map(|t| t.to_mcp_tool()).collect()
    }

    /// Run the dispatch transaction for one `tools/call`. Every externally
    /// observable side effect (honey-token writes, the interaction log row,
    /// event publishes, the session persist) happens in this fixed order.
    pub async fn dispatch(&self, tool_name: &str, arguments: &Value, session_id: &str) -> anyhow::Result<ToolCallOutcome> {
        let Some(simulator) = self.tools.get(tool_name) else {
            return Ok(ToolCallOutcome::error(format!("Error: unknown tool '{tool_name}'")));
        };

        if self.sessions.get(session_id).await?.is_none() {
            return Ok(ToolCallOutcome::error("Error: invalid session"));
        }
        let tokens_before = self.token_count(session_id).await?;

        let args_for_sim = arguments.clone();
        let store_for_sim = Arc::clone(&self.store);
        let outcome = self
            .sessions
            .with_session_mut_result(session_id, move |ctx| simulator.simulate(&args_for_sim, ctx, &store_for_sim))
            .await?;

        let Some((mut session, sim_result)) = outcome else {
            return Ok(ToolCallOutcome::error("Error: invalid session"));
        };

        let tokens_after = self.token_count(session_id).await?;

        let raw_output = sim_result.output.clone();

        let computed_level = engagement::compute_escalation(&session);
        if computed_level > session.escalation_level {
            session.escalation_level = computed_level;
        }

        let enriched_output = engagement::enrich_output(&raw_output, &session);
        let injection = extract_injection(&raw_output, &enriched_output);
        let prompt_summary = summarize_call(tool_name, arguments);

        let response = json!({"output": enriched_output, "isError": sim_result.is_error});
        self.log_interaction(session_id, tool_name, arguments, &response, sim_result.escalation_delta).await?;

        self.bus
            .publish(
                "interaction",
                json!({
                    "session_id": session_id,
                    "tool_name": tool_name,
                    "arguments": arguments,
                    "escalation_delta": sim_result.escalation_delta,
                    "escalation_level": session.escalation_level,
                    "timestamp": crate::db::now_iso(),
                    "prompt_summary": prompt_summary,
                    "injection": injection,
                }),
            )
            .await;

        if tokens_after > tokens_before {
            self.bus
                .publish(
                    "token_deployed",
                    json!({"session_id": session_id, "tool_name": tool_name, "count": tokens_after - tokens_before}),
                )
                .await;
        }

        if sim_result.escalation_delta > 0 {
            session.escalate(sim_result.escalation_delta);
            self.bus
                .publish("session_update", json!({"session_id": session_id, "escalation_level": session.escalation_level}))
                .await;
        }

        let final_level = session.escalation_level;
        self.sessions.with_session_mut(session_id, |ctx| ctx.escalation_level = final_level).await?;
        self.sessions.persist(session_id).await?;

        Ok(ToolCallOutcome { output: enriched_output, is_error: sim_result.is_error })
    }

    async fn token_count(&self, session_id: &str) -> anyhow::Result<i64> {
        let store = Arc::clone(&self.store);
        let id = session_id.to_owned();
        tokio::task::spawn_blocking(move || store.token_count(&id)).await?
    }

    async fn log_interaction(
        &self,
        session_id: &str,
        tool_name: &str,
        params: &Value,
        response: &Value,
        escalation_delta: i64,
    ) -> anyhow::Result<()> {
        let store = Arc::clone(&self.store);
        let session_id = session_id.to_owned();
        let tool_name = tool_name.to_owned();
        let params = params.clone();
        let response = response.clone();
        tokio::task::spawn_blocking(move || {
            store.log_interaction(&session_id, "tools/call", Some(&tool_name), &params, &response, escalation_delta)
        })
        .await??;
        Ok(())
    }
}

/// Diff enriched vs. raw output to recover the text `enrich_output` injected,
/// stripping a leading breadcrumb marker if present. Returns `None` when
/// enrichment left the output unchanged.
fn extract_injection(raw: &str, enriched: &str) -> Option<String> {
    if enriched == raw {
        return None;
    }
    if let Some(suffix) = enriched.strip_prefix(raw) {
        // Breadcrumb appended: "{raw}\n\n# {breadcrumb}"
        let trimmed = suffix.trim_start_matches('\n');
        return Some(trimmed.trim_start_matches("# ").to_owned());
    }
    if let Some(prefix) = enriched.strip_suffix(raw) {
        // Transient error prepended: "{error}\n\n{raw}"
        let trimmed = prefix.trim_end_matches('\n');
        return Some(trimmed.to_owned());
    }
    None
}

/// Short human-readable summary of a tool call for the event payload.
fn summarize_call(tool_name: &str, arguments: &Value) -> String {
    let salient = arguments
        .as_object()
        .and_then(|obj| obj.values().find_map(Value::as_str))
        .unwrap_or("");
    if salient.is_empty() {
        tool_name.to_owned()
    } else {
        format!("{tool_name}({salient})")
    }
}
