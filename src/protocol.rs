// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 router: dispatches `initialize`, `ping`, `tools/list`,
//! `tools/call`, and `notifications/initialized` against the session manager
//! and tool registry. Transport-agnostic — the HTTP layer hands it a parsed
//! request body and gets back an optional response plus the session id to
//! echo in the `Mcp-Session-Id` header.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::HoneypotError;
use crate::registry::ToolRegistry;
use crate::session::SessionManager;

/// Outcome of routing one JSON-RPC request.
pub struct RouteOutcome {
    /// `None` for notifications — no reply is sent, but side effects (session
    /// creation, touch) still happened.
    pub response: Option<Value>,
    pub session_id: Option<String>,
}

pub struct ProtocolHandler {
    sessions: Arc<SessionManager>,
    registry: Arc<ToolRegistry>,
}

impl ProtocolHandler {
    pub fn new(sessions: Arc<SessionManager>, registry: Arc<ToolRegistry>) -> Self {
        Self { sessions, registry }
    }

    /// Route one already-parsed JSON-RPC request.
    pub async fn handle(&self, request: &Value, session_id: Option<String>) -> RouteOutcome {
        let req_id = request.get("id").cloned().unwrap_or(Value::Null);
        let is_notification = request.get("id").is_none();

        if request.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return self.reject(is_notification, req_id, session_id, HoneypotError::InvalidRequest, "Invalid Request: requires jsonrpc 2.0");
        }

        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return self.reject(is_notification, req_id, session_id, HoneypotError::InvalidRequest, "Invalid Request: missing method");
        };

        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        let result = match method {
            "initialize" => self.handle_initialize(&params).await,
            "ping" => Ok((json!({}), session_id.clone())),
            "tools/list" => self.handle_tools_list(session_id.clone()).await,
            "tools/call" => self.handle_tools_call(&params, session_id.clone()).await,
            "notifications/initialized" => self.handle_initialized(session_id.clone()).await,
            other => {
                if is_notification {
                    return RouteOutcome { response: None, session_id };
                }
                return self.reject(false, req_id, session_id, HoneypotError::MethodNotFound, format!("Method not found: {other}"));
            }
        };

        match result {
            Ok((value, new_session_id)) => {
                let session_id = new_session_id.or(session_id);
                if is_notification {
                    RouteOutcome { response: None, session_id }
                } else {
                    RouteOutcome { response: Some(json!({"jsonrpc": "2.0", "id": req_id, "result": value})), session_id }
                }
            }
            Err(err) => {
                error!(method, error = %err, "handler error");
                if is_notification {
                    RouteOutcome { response: None, session_id }
                } else {
                    RouteOutcome {
                        response: Some(HoneypotError::Internal.to_rpc_error(req_id, "Internal error")),
                        session_id,
                    }
                }
            }
        }
    }

    fn reject(
        &self,
        is_notification: bool,
        req_id: Value,
        session_id: Option<String>,
        err: HoneypotError,
        message: impl Into<String>,
    ) -> RouteOutcome {
        if is_notification {
            return RouteOutcome { response: None, session_id };
        }
        RouteOutcome { response: Some(err.to_rpc_error(req_id, message)), session_id }
    }

    async fn handle_initialize(&self, params: &Value) -> anyhow::Result<(Value, Option<String>)> {
        let client_info = params.get("clientInfo").cloned().unwrap_or_else(|| json!({}));
        let new_session_id = self.sessions.create(client_info.clone()).await?;

        info!(
            session_id = %new_session_id,
            client = %client_info.get("name").and_then(Value::as_str).unwrap_or("unknown"),
            "new session"
        );

        let result = json!({
            "protocolVersion": crate::config::PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {
                "name": crate::config::SERVER_NAME,
                "version": crate::config::SERVER_VERSION,
            },
        });
        Ok((result, Some(new_session_id)))
    }

    async fn handle_initialized(&self, session_id: Option<String>) -> anyhow::Result<(Value, Option<String>)> {
        if let Some(id) = &session_id {
            self.sessions.touch(id).await?;
        }
        Ok((json!({}), session_id))
    }

    async fn handle_tools_list(&self, session_id: Option<String>) -> anyhow::Result<(Value, Option<String>)> {
        if let Some(id) = &session_id {
            self.sessions.touch(id).await?;
        }
        Ok((json!({"tools": self.registry.list_tools()}), session_id))
    }

    async fn handle_tools_call(&self, params: &Value, session_id: Option<String>) -> anyhow::Result<(Value, Option<String>)> {
        let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
            return Ok((error_content("Error: missing tool name"), session_id));
        };
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let Some(id) = &session_id else {
            return Ok((error_content("Error: no active session"), session_id));
        };

        self.sessions.touch(id).await?;
        let outcome = self.registry.dispatch(tool_name, &arguments, id).await?;

        Ok((
            json!({
                "content": [{"type": "text", "text": outcome.output}],
                "isError": outcome.is_error,
            }),
            session_id,
        ))
    }
}

fn error_content(message: &str) -> Value {
    json!({"content": [{"type": "text", "text": message}], "isError": true})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::event_bus::EventBus;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    async fn test_handler() -> ProtocolHandler {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let bus = Arc::new(EventBus::new());
        let sessions = SessionManager::new(Arc::clone(&store), Arc::clone(&bus), Duration::from_secs(3600), CancellationToken::new());
        let registry = Arc::new(ToolRegistry::new(Arc::clone(&store), Arc::clone(&sessions), bus));
        ProtocolHandler::new(sessions, registry)
    }

    #[tokio::test]
    async fn test_initialize_creates_session_and_returns_info() {
        let handler = test_handler().await;
        let request = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"clientInfo": {"name": "probe"}}});
        let outcome = handler.handle(&request, None).await;

        assert!(outcome.session_id.is_some());
        let response = outcome.response.unwrap();
        assert_eq!(response["result"]["serverInfo"]["name"], json!(crate::config::SERVER_NAME));
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let handler = test_handler().await;
        let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let outcome = handler.handle(&request, Some("deadbeef".to_string())).await;
        assert!(outcome.response.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_returns_method_not_found() {
        let handler = test_handler().await;
        let request = json!({"jsonrpc": "2.0", "id": 2, "method": "bogus/method"});
        let outcome = handler.handle(&request, None).await;
        let response = outcome.response.unwrap();
        assert_eq!(response["error"]["code"], json!(-32601));
    }

    #[tokio::test]
    async fn test_wrong_jsonrpc_version_rejected() {
        let handler = test_handler().await;
        let request = json!({"jsonrpc": "1.0", "id": 3, "method": "ping"});
        let outcome = handler.handle(&request, None).await;
        let response = outcome.response.unwrap();
        assert_eq!(response["error"]["code"], json!(-32600));
    }

    #[tokio::test]
    async fn test_tools_call_without_session_is_soft_error() {
        let handler = test_handler().await;
        let request = json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"name": "nmap_scan", "arguments": {}}});
        let outcome = handler.handle(&request, None).await;
        let response = outcome.response.unwrap();
        assert_eq!(response["result"]["isError"], json!(true));
        assert!(response["result"]["content"][0]["text"].as_str().unwrap().contains("no active session"));
    }

    #[tokio::test]
    async fn test_tools_call_roundtrip_with_real_session() {
        let handler = test_handler().await;
        let init = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}});
        let init_outcome = handler.handle(&init, None).await;
        let session_id = init_outcome.session_id.unwrap();

        let call = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "dns_lookup", "arguments": {"hostname": "db.corp.internal"}}});
        let outcome = handler.handle(&call, Some(session_id)).await;
        let response = outcome.response.unwrap();
        assert_eq!(response["result"]["isError"], json!(false));
    }

    #[tokio::test]
    async fn test_ping_echoes_session_id_unchanged() {
        let handler = test_handler().await;
        let request = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
        let outcome = handler.handle(&request, Some("cafebabe".to_string())).await;
        assert_eq!(outcome.session_id, Some("cafebabe".to_string()));
    }
}
