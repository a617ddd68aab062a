//! Access-review authority clients.

use crate::credentials::{ClientAuth, ClusterCredentials};
use crate::error::AuthzError;
use crate::review::{REVIEWS_PATH, SubjectAccessReview};
use crate::types::{AccessQuery, Decision};
use async_trait::async_trait;
use std::time::Duration;
use tenant_gate_core::Result;
use tracing::{debug, instrument};

/// The external service that decides whether a query is allowed.
///
/// `Ok(None)` means the authority answered but attached no decision.
#[async_trait]
pub trait AccessAuthority: Send + Sync {
    /// Submits a query and returns the authority's decision.
    async fn submit(&self, query: &AccessQuery) -> Result<Option<Decision>, AuthzError>;
}

/// Timeouts for talking to the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityOptions {
    /// Upper bound on a whole review round trip.
    pub timeout: Duration,
    /// Upper bound on establishing the connection.
    pub connect_timeout: Duration,
}

impl Default for AuthorityOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Submits `SubjectAccessReview`s to a Kubernetes API server.
///
/// The underlying HTTP client is connection-pooled and safe to share, so
/// clones are cheap and concurrent reviews need no locking.
#[derive(Clone)]
pub struct KubeAuthority {
    http: reqwest::Client,
    reviews_url: String,
    bearer_token: Option<String>,
}

impl KubeAuthority {
    /// Creates a client for the API server described by `credentials`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` if the CA bundle or client certificate
    /// cannot be parsed, or `ClientBuild` if the HTTP client fails to build.
    pub fn new(
        credentials: &ClusterCredentials,
        options: AuthorityOptions,
    ) -> Result<Self, AuthzError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout);

        if let Some(pem) = &credentials.ca_pem {
            let certificates = reqwest::Certificate::from_pem_bundle(pem).map_err(|e| {
                AuthzError::InvalidCredentials {
                    details: format!("parsing CA bundle: {}", e),
                }
            })?;
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        if credentials.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let bearer_token = match &credentials.auth {
            ClientAuth::None => None,
            ClientAuth::BearerToken(token) => Some(token.clone()),
            ClientAuth::ClientCertificate(pem) => {
                let identity = reqwest::Identity::from_pem(pem).map_err(|e| {
                    AuthzError::InvalidCredentials {
                        details: format!("parsing client certificate: {}", e),
                    }
                })?;
                builder = builder.identity(identity);
                None
            }
        };

        let http = builder.build().map_err(|e| AuthzError::ClientBuild {
            details: e.to_string(),
        })?;

        Ok(Self {
            http,
            reviews_url: format!("{}{}", credentials.server.trim_end_matches('/'), REVIEWS_PATH),
            bearer_token,
        })
    }

    /// The URL reviews are posted to.
    #[must_use]
    pub fn reviews_url(&self) -> &str {
        &self.reviews_url
    }
}

#[async_trait]
impl AccessAuthority for KubeAuthority {
    #[instrument(skip(self, query), fields(verb = %query.verb, resource = %query.kind))]
    async fn submit(&self, query: &AccessQuery) -> Result<Option<Decision>, AuthzError> {
        let review = SubjectAccessReview::for_query(query);

        let mut request = self.http.post(&self.reviews_url).json(&review);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| AuthzError::RequestFailed {
            details: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthzError::rejected(status.as_u16(), status.canonical_reason(), &body).into());
        }

        let answered: SubjectAccessReview =
            response
                .json()
                .await
                .map_err(|e| AuthzError::InvalidResponse {
                    details: e.to_string(),
                })?;

        let decision = answered.decision();
        debug!(has_status = decision.is_some(), "access review answered");
        Ok(decision)
    }
}
