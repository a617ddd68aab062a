//! Caller identity extraction for Axum.
//!
//! The identity comes from a header injected by the auth proxy in front of
//! the service. Requests without the header are anonymous and pass every
//! authorization check, so the proxy must strip it from untrusted clients.
//! A header that is present but unusable is rejected, never treated as
//! anonymous.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tenant_gate_core::Identity;
use tracing::warn;

use crate::config::IdentityConfig;
use crate::state::AppState;

/// Extractor for the caller identity, `None` when anonymous.
pub struct CallerIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for CallerIdentity
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let identity = resolve_identity(&parts.headers, &app_state.identity).inspect_err(|e| {
            warn!(
                header = %app_state.identity.header,
                path = %parts.uri.path(),
                reason = ?e,
                "rejecting request with unusable caller identity"
            );
        })?;
        if identity.is_none() {
            warn!(
                header = %app_state.identity.header,
                path = %parts.uri.path(),
                "request has no caller identity, authorization checks are bypassed"
            );
        }
        Ok(CallerIdentity(identity))
    }
}

/// Rejection for an identity header that cannot name a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRejection {
    /// The header value is not valid UTF-8.
    Undecodable,
    /// The header value is blank once the prefix is removed.
    Empty,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let log = match self {
            Self::Undecodable => "Caller identity header is not valid UTF-8",
            Self::Empty => "Caller identity header is empty",
        };
        (
            StatusCode::FORBIDDEN,
            Json(json!({"success": false, "log": log})),
        )
            .into_response()
    }
}

/// Reads the caller identity from `headers`.
///
/// Only a missing header is anonymous. Values that are not UTF-8, or are
/// blank after the prefix is removed, are rejected.
pub fn resolve_identity(
    headers: &HeaderMap,
    config: &IdentityConfig,
) -> Result<Option<Identity>, IdentityRejection> {
    let Some(value) = headers.get(config.header.as_str()) else {
        return Ok(None);
    };
    let value = String::from_utf8(value.as_bytes().to_vec())
        .map_err(|_| IdentityRejection::Undecodable)?;
    let name = value.strip_prefix(config.prefix.as_str()).unwrap_or(&value);
    Identity::new(name)
        .map(Some)
        .map_err(|_| IdentityRejection::Empty)
}
