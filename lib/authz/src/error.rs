//! Authorization error types.

use std::fmt;

/// Authorization errors.
///
/// None of these reach a gated handler: the gate logs them and denies.
/// They surface only at startup (credential loading, client construction)
/// and from [`AccessAuthority`](crate::AccessAuthority) implementations.
#[derive(Debug)]
pub enum AuthzError {
    /// No usable cluster credentials were found.
    CredentialsUnavailable {
        /// Why each credential source was rejected.
        details: String,
    },
    /// Credentials were found but could not be used.
    InvalidCredentials {
        /// Error details.
        details: String,
    },
    /// Failed to build the HTTP client for the authority.
    ClientBuild {
        /// Error details.
        details: String,
    },
    /// The request never produced a response (unreachable, timeout, TLS).
    RequestFailed {
        /// Error details.
        details: String,
    },
    /// The authority answered with a non-success status.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Detail parsed from the response body.
        message: String,
    },
    /// The authority's response could not be decoded.
    InvalidResponse {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for AuthzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsUnavailable { details } => {
                write!(f, "no cluster credentials available: {}", details)
            }
            Self::InvalidCredentials { details } => {
                write!(f, "invalid cluster credentials: {}", details)
            }
            Self::ClientBuild { details } => {
                write!(f, "failed to build authorization client: {}", details)
            }
            Self::RequestFailed { details } => {
                write!(f, "authorization request failed: {}", details)
            }
            Self::Rejected { status, message } => {
                write!(
                    f,
                    "authorization request rejected with status {}: {}",
                    status, message
                )
            }
            Self::InvalidResponse { details } => {
                write!(f, "invalid authorization response: {}", details)
            }
        }
    }
}

impl std::error::Error for AuthzError {}

impl AuthzError {
    /// Builds a `Rejected` error from an HTTP error response.
    ///
    /// The message is the `message` field of a Kubernetes `Status` body when
    /// one decodes, otherwise the raw body, otherwise the status reason.
    #[must_use]
    pub fn rejected(status: u16, reason: Option<&str>, body: &str) -> Self {
        Self::Rejected {
            status,
            message: parse_error_detail(reason, body),
        }
    }
}

fn parse_error_detail(reason: Option<&str>, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct StatusBody {
        message: String,
    }

    if let Ok(status) = serde_json::from_str::<StatusBody>(body) {
        return status.message;
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    reason.unwrap_or("unknown error").to_string()
}
