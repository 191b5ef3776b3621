// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the honeypot HTTP API.
//!
//! Uses `axum_test::TestServer` — no real TCP needed.

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use honeytrap_mcp::config::HoneypotConfig;
use honeytrap_mcp::db::Store;
use honeytrap_mcp::state::AppState;
use honeytrap_mcp::transport::build_router;

fn test_config() -> HoneypotConfig {
    HoneypotConfig::for_test()
}

fn test_server() -> TestServer {
    let store = Arc::new(Store::open_in_memory().expect("open in-memory store"));
    let state = AppState::new(test_config(), store, CancellationToken::new());
    let router = build_router(state);
    TestServer::new(router).expect("failed to create test server")
}

#[tokio::test]
async fn health_reports_ok() {
    let server = test_server();
    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn initialize_returns_session_header_and_server_info() {
    let server = test_server();
    let resp = server
        .post("/mcp")
        .add_header("content-type", "application/json")
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"clientInfo": {"name": "probe"}}}))
        .await;

    resp.assert_status_ok();
    let session_header = resp.header("mcp-session-id");
    let session_id = session_header.to_str().unwrap().to_owned();
    assert_eq!(session_id.len(), 32);

    let body: serde_json::Value = resp.json();
    assert_eq!(body["result"]["serverInfo"]["name"], "internal-devops-tools");
}

#[tokio::test]
async fn notification_gets_204_no_content() {
    let server = test_server();
    let init = server
        .post("/mcp")
        .add_header("content-type", "application/json")
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
        .await;
    let session_id = init.header("mcp-session-id").to_str().unwrap().to_owned();

    let resp = server
        .post("/mcp")
        .add_header("content-type", "application/json")
        .add_header("mcp-session-id", &session_id)
        .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    resp.assert_status(axum::http::StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn tools_call_without_session_is_soft_error_at_200() {
    let server = test_server();
    let resp = server
        .post("/mcp")
        .add_header("content-type", "application/json")
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "nmap_scan", "arguments": {}}}))
        .await;

    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["result"]["isError"], true);
}

#[tokio::test]
async fn malformed_session_header_rejected() {
    let server = test_server();
    let resp = server
        .post("/mcp")
        .add_header("content-type", "application/json")
        .add_header("mcp-session-id", "not-32-hex-chars")
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .await;

    resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], -32600);
}

#[tokio::test]
async fn wrong_content_type_rejected() {
    let server = test_server();
    let resp = server
        .post("/mcp")
        .add_header("content-type", "text/plain")
        .text("{}")
        .await;
    resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_roundtrip_discovers_tools_and_calls_one() {
    let server = test_server();
    let init = server
        .post("/mcp")
        .add_header("content-type", "application/json")
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
        .await;
    let session_id = init.header("mcp-session-id").to_str().unwrap().to_owned();

    let list = server
        .post("/mcp")
        .add_header("content-type", "application/json")
        .add_header("mcp-session-id", &session_id)
        .json(&json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .await;
    let body: serde_json::Value = list.json();
    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 10);

    let call = server
        .post("/mcp")
        .add_header("content-type", "application/json")
        .add_header("mcp-session-id", &session_id)
        .json(&json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "file_read", "arguments": {"path": "/app/.env"}}}))
        .await;
    let call_body: serde_json::Value = call.json();
    assert_eq!(call_body["result"]["isError"], false);

    let tokens_resp = server.get("/api/tokens").await;
    tokens_resp.assert_status_ok();
    let tokens: serde_json::Value = tokens_resp.json();
    assert!(tokens.as_array().unwrap().len() >= 3);
}

#[tokio::test]
async fn dashboard_session_lookup_404s_for_unknown_id() {
    let server = test_server();
    let resp = server.get(&format!("/api/sessions/{}", "f".repeat(32))).await;
    resp.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_requires_bearer_when_key_configured() {
    let store = Arc::new(Store::open_in_memory().expect("open in-memory store"));
    let mut config = test_config();
    config.dashboard_api_key = Some("topsecret".to_owned());
    let state = AppState::new(config, store, CancellationToken::new());
    let server = TestServer::new(build_router(state)).expect("failed to create test server");

    let unauthorized = server.get("/api/stats").await;
    unauthorized.assert_status(axum::http::StatusCode::UNAUTHORIZED);

    let authorized = server.get("/api/stats").add_header("authorization", "Bearer topsecret").await;
    authorized.assert_status_ok();
}

#[tokio::test]
async fn dashboard_rejects_unknown_token_type_filter() {
    let server = test_server();
    let resp = server.get("/api/tokens?token_type=bogus").await;
    resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
}
