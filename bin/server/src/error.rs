//! API error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Errors returned to API callers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body is missing a required field.
    InvalidRequest { details: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest { details } => write!(f, "invalid request: {}", details),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        };
        let body = Json(json!({
            "success": false,
            "log": self.to_string(),
        }));
        (status, body).into_response()
    }
}
