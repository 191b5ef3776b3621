// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport: router assembly for the MCP endpoint, health check, live
//! event stream, and dashboard read API.

pub mod auth;
pub mod http;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, Request};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the axum `Router` for the honeypot server.
pub fn build_router(state: Arc<AppState>) -> Router {
    let dashboard = Router::new()
        .route("/api/stats", get(http::get_stats))
        .route("/api/sessions", get(http::list_sessions))
        .route("/api/sessions/{id}", get(http::get_session))
        .route("/api/sessions/{id}/interactions", get(http::session_interactions))
        .route("/api/sessions/{id}/tokens", get(http::session_tokens))
        .route("/api/tokens", get(http::list_tokens))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), dashboard_rate_limit_layer))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth::auth_layer));

    let cors = cors_layer(state.config.allowed_origin.as_deref());

    Router::new()
        .route("/mcp", post(http::mcp_handler))
        .route("/health", get(http::health))
        .route("/api/events/live", get(http::events_live))
        .merge(dashboard)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security_headers_layer))
        .layer(cors)
        .with_state(state)
}

/// Echo `Access-Control-Allow-Origin` only when the request's `Origin`
/// exactly matches the configured value; with none configured, no origin is
/// ever allowed cross-origin access.
fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed_origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(value) => AllowOrigin::exact(value),
        None => AllowOrigin::list([]),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
}

/// Set the mandated security response headers on every response.
async fn security_headers_layer(req: Request<axum::body::Body>, next: middleware::Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    response
}

/// Per-address sliding-window limiter for the dashboard read API.
async fn dashboard_rate_limit_layer(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    if !state.dashboard_limiter.check(&addr.to_string()) {
        return crate::error::HoneypotError::RateLimited.to_http_response("rate limit exceeded").into_response();
    }
    next.run(req).await
}
