// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::HoneypotError;
use crate::state::AppState;

/// Constant-time string comparison to prevent timing side-channel attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate a Bearer token from HTTP headers. `None` expected token disables auth.
pub fn validate_bearer(headers: &axum::http::HeaderMap, expected: Option<&str>) -> Result<(), HoneypotError> {
    let expected = match expected {
        Some(tok) => tok,
        None => return Ok(()),
    };

    let header =
        headers.get("authorization").and_then(|v| v.to_str().ok()).ok_or(HoneypotError::Unauthorized)?;

    let token = header.strip_prefix("Bearer ").ok_or(HoneypotError::Unauthorized)?;
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(HoneypotError::Unauthorized)
    }
}

/// Axum middleware enforcing the dashboard bearer key.
///
/// Exempt: `/mcp`, `/health`, and `/api/events/live` — the MCP endpoint is
/// authenticated by session id, not the dashboard key, and the health check
/// and live stream are meant to be reachable without credentials.
pub async fn auth_layer(state: State<Arc<AppState>>, req: Request<axum::body::Body>, next: Next) -> Response {
    let path = req.uri().path();

    if path == "/mcp" || path == "/health" || path == "/api/events/live" {
        return next.run(req).await;
    }

    if let Err(err) = validate_bearer(req.headers(), state.config.dashboard_api_key.as_deref()) {
        let (status, body) = err.to_http_response("unauthorized");
        return (status, body).into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn test_no_expected_token_always_passes() {
        assert!(validate_bearer(&HeaderMap::new(), None).is_ok());
    }

    #[test]
    fn test_missing_header_rejected() {
        assert_eq!(validate_bearer(&HeaderMap::new(), Some("secret")), Err(HoneypotError::Unauthorized));
    }

    #[test]
    fn test_correct_bearer_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        assert!(validate_bearer(&headers, Some("secret")).is_ok());
    }

    #[test]
    fn test_wrong_bearer_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer nope".parse().unwrap());
        assert_eq!(validate_bearer(&headers, Some("secret")), Err(HoneypotError::Unauthorized));
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic secret".parse().unwrap());
        assert_eq!(validate_bearer(&headers, Some("secret")), Err(HoneypotError::Unauthorized));
    }
}
