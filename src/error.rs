// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-RPC and transport-level error taxonomy for the honeypot server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoneypotError {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    Internal,
    RateLimited,
    NotFound,
    Unauthorized,
    BadRequest,
}

impl HoneypotError {
    /// JSON-RPC 2.0 error code.
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::Internal => -32603,
            Self::RateLimited => -32000,
            // The remaining variants are transport/dashboard-only and never
            // surface as a JSON-RPC envelope.
            Self::NotFound | Self::Unauthorized | Self::BadRequest => -32603,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::ParseError | Self::InvalidRequest | Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::RateLimited => 429,
            Self::MethodNotFound => 200,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "PARSE_ERROR",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::MethodNotFound => "METHOD_NOT_FOUND",
            Self::Internal => "INTERNAL",
            Self::RateLimited => "RATE_LIMITED",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
        }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: message.into() };
        (status, Json(body))
    }

    /// Render as a JSON-RPC error envelope for the given request id.
    pub fn to_rpc_error(&self, id: serde_json::Value, message: impl Into<String>) -> serde_json::Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": self.rpc_code(), "message": message.into() },
        })
    }
}

impl fmt::Display for HoneypotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error response envelope for the dashboard read API: a flat
/// `{"error": "<message>"}`, matching the original dashboard API's contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
