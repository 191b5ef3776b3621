// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers: the MCP JSON-RPC endpoint, health check, live SSE event
//! stream, and the dashboard read API.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::error::HoneypotError;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;
const SESSION_HEADER: &str = "mcp-session-id";
const LIVE_STREAM_CAP: Duration = Duration::from_secs(5 * 60);

fn is_valid_session_id(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn rpc_error_response(status: u16, err: HoneypotError, id: Value, message: impl Into<String>) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(err.to_rpc_error(id, message))).into_response()
}

/// `POST /mcp` — the JSON-RPC 2.0 MCP endpoint.
pub async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/json") {
        return rpc_error_response(400, HoneypotError::ParseError, Value::Null, "Content-Type must be application/json");
    }

    if body.len() > MAX_BODY_BYTES {
        return rpc_error_response(400, HoneypotError::ParseError, Value::Null, "request body too large");
    }

    let request: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return rpc_error_response(400, HoneypotError::ParseError, Value::Null, "Parse error"),
    };

    let incoming_session_id = match headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        Some(raw) if is_valid_session_id(raw) => Some(raw.to_owned()),
        Some(_) => {
            let id = request.get("id").cloned().unwrap_or(Value::Null);
            return rpc_error_response(400, HoneypotError::InvalidRequest, id, "Invalid Mcp-Session-Id header");
        }
        None => None,
    };

    let rate_key = incoming_session_id.clone().unwrap_or_else(|| addr.to_string());
    if !state.mcp_limiter.check(&rate_key) {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        return rpc_error_response(429, HoneypotError::RateLimited, id, "rate limit exceeded");
    }

    let outcome = state.protocol.handle(&request, incoming_session_id).await;

    let mut response = match outcome.response {
        None => StatusCode::NO_CONTENT.into_response(),
        Some(body) => (StatusCode::OK, Json(body)).into_response(),
    };

    if let Some(session_id) = outcome.session_id {
        if let Ok(value) = axum::http::HeaderValue::from_str(&session_id) {
            response.headers_mut().insert("Mcp-Session-Id", value);
        }
    }

    response
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub server: &'static str,
    pub version: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        server: crate::config::SERVER_NAME,
        version: crate::config::SERVER_VERSION,
    })
}

/// `GET /api/events/live` — server-sent events, bounded to
/// [`crate::state::MAX_LIVE_SUBSCRIBERS`] concurrent subscribers and a hard
/// 5-minute connection lifetime after which clients are asked to reconnect.
pub async fn events_live(State(state): State<Arc<AppState>>) -> Response {
    if !state.try_acquire_live_slot() {
        return HoneypotError::RateLimited.to_http_response("too many live subscribers").into_response();
    }

    let subscription = state.bus.subscribe().await;

    let store = Arc::clone(&state.store);
    let initial_stats = tokio::task::spawn_blocking(move || store.get_stats()).await;

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<SseEvent, Infallible>>(32);

    tokio::spawn(async move {
        if let Ok(Ok(stats)) = initial_stats {
            if let Ok(event) = SseEvent::default().event("stats").json_data(&stats) {
                if tx.send(Ok(event)).await.is_err() {
                    state.bus.unsubscribe(&subscription.notify).await;
                    state.release_live_slot();
                    return;
                }
            }
        }

        let mut last_id = subscription.last_id;
        let deadline = Instant::now() + LIVE_STREAM_CAP;

        loop {
            let now = Instant::now();
            if now >= deadline {
                let _ = tx.send(Ok(SseEvent::default().event("reconnect").data(""))).await;
                break;
            }

            let wait = deadline.saturating_duration_since(now).min(Duration::from_secs(1));
            let _ = tokio::time::timeout(wait, subscription.notify.notified()).await;

            let events = state.bus.events_since(last_id).await;
            if events.is_empty() {
                if tx.send(Ok(SseEvent::default().comment("keep-alive"))).await.is_err() {
                    break;
                }
                continue;
            }

            let mut disconnected = false;
            for ev in events {
                last_id = ev.id;
                let Ok(sse) = SseEvent::default().id(ev.id.to_string()).event(ev.event_type.clone()).json_data(&ev.data) else {
                    continue;
                };
                if tx.send(Ok(sse)).await.is_err() {
                    disconnected = true;
                    break;
                }
            }
            if disconnected {
                break;
            }
        }

        state.bus.unsubscribe(&subscription.notify).await;
        state.release_live_slot();
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()).into_response()
}

// -- Dashboard read API -------------------------------------------------------

fn clamp_limit(raw: Option<i64>) -> i64 {
    raw.unwrap_or(50).clamp(1, 200)
}

fn clamp_offset(raw: Option<i64>) -> i64 {
    raw.unwrap_or(0).max(0)
}

async fn blocking<T, F>(f: F) -> Result<T, Response>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            warn!(error = %err, "store query failed");
            Err(HoneypotError::Internal.to_http_response("internal error").into_response())
        }
        Err(err) => {
            warn!(error = %err, "blocking task panicked");
            Err(HoneypotError::Internal.to_http_response("internal error").into_response())
        }
    }
}

/// `GET /api/stats`
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Response {
    let store = Arc::clone(&state.store);
    match blocking(move || store.get_stats()).await {
        Ok(stats) => Json(stats).into_response(),
        Err(resp) => resp,
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub escalation_level: Option<i64>,
    pub since: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/sessions`
pub async fn list_sessions(State(state): State<Arc<AppState>>, Query(q): Query<SessionsQuery>) -> Response {
    let store = Arc::clone(&state.store);
    let limit = clamp_limit(q.limit);
    let offset = clamp_offset(q.offset);
    match blocking(move || store.get_all_sessions(q.escalation_level, q.since.as_deref(), limit, offset)).await {
        Ok(sessions) => Json(sessions).into_response(),
        Err(resp) => resp,
    }
}

/// `GET /api/sessions/{id}`
pub async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let store = Arc::clone(&state.store);
    let lookup_id = id.clone();
    match blocking(move || store.get_session(&lookup_id)).await {
        Ok(Some(session)) => Json(session).into_response(),
        Ok(None) => HoneypotError::NotFound.to_http_response(format!("no such session: {id}")).into_response(),
        Err(resp) => resp,
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/sessions/{id}/interactions`
pub async fn session_interactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<PageQuery>,
) -> Response {
    let store = Arc::clone(&state.store);
    let lookup_id = id.clone();
    match blocking(move || store.get_session(&lookup_id)).await {
        Ok(None) => return HoneypotError::NotFound.to_http_response(format!("no such session: {id}")).into_response(),
        Err(resp) => return resp,
        Ok(Some(_)) => {}
    }

    let store = Arc::clone(&state.store);
    let limit = clamp_limit(q.limit);
    let offset = clamp_offset(q.offset);
    match blocking(move || store.get_session_interactions(&id, limit, offset)).await {
        Ok(rows) => Json(rows).into_response(),
        Err(resp) => resp,
    }
}

/// `GET /api/sessions/{id}/tokens`
pub async fn session_tokens(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let store = Arc::clone(&state.store);
    let lookup_id = id.clone();
    match blocking(move || store.get_session(&lookup_id)).await {
        Ok(None) => return HoneypotError::NotFound.to_http_response(format!("no such session: {id}")).into_response(),
        Err(resp) => return resp,
        Ok(Some(_)) => {}
    }

    let store = Arc::clone(&state.store);
    match blocking(move || store.get_session_tokens(&id)).await {
        Ok(rows) => Json(rows).into_response(),
        Err(resp) => resp,
    }
}

const KNOWN_TOKEN_TYPES: &[&str] = &["aws_access_key", "api_token", "db_credential", "admin_login", "ssh_key"];

#[derive(Debug, Deserialize)]
pub struct TokensQuery {
    pub token_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/tokens`
pub async fn list_tokens(State(state): State<Arc<AppState>>, Query(q): Query<TokensQuery>) -> Response {
    if let Some(t) = &q.token_type {
        if !KNOWN_TOKEN_TYPES.contains(&t.as_str()) {
            return HoneypotError::BadRequest.to_http_response(format!("unknown token_type: {t}")).into_response();
        }
    }

    let store = Arc::clone(&state.store);
    let limit = clamp_limit(q.limit);
    let offset = clamp_offset(q.offset);
    match blocking(move || store.get_all_tokens(q.token_type.as_deref(), limit, offset)).await {
        Ok(rows) => Json(rows).into_response(),
        Err(resp) => resp,
    }
}

/// Live-stream subscriber count, surfaced for operational visibility.
pub fn live_stream_stats(state: &AppState) -> Value {
    json!({"subscribers": state.live_subscribers.load(std::sync::atomic::Ordering::SeqCst)})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_session_id_accepts_32_hex() {
        assert!(is_valid_session_id(&"a".repeat(32)));
        assert!(is_valid_session_id("0123456789abcdef0123456789abcdef"));
    }

    #[test]
    fn test_is_valid_session_id_rejects_bad_shape() {
        assert!(!is_valid_session_id("too-short"));
        assert!(!is_valid_session_id(&"g".repeat(32)));
        assert!(!is_valid_session_id(&"A".repeat(32)));
    }

    #[test]
    fn test_clamp_limit_defaults_and_bounds() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), 200);
        assert_eq!(clamp_limit(Some(75)), 75);
    }

    #[test]
    fn test_clamp_offset_floors_at_zero() {
        assert_eq!(clamp_offset(Some(-5)), 0);
        assert_eq!(clamp_offset(Some(10)), 10);
        assert_eq!(clamp_offset(None), 0);
    }
}
