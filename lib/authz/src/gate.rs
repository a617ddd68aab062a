//! The access gate and its handler-wrapping combinator.
//!
//! Every check is a single round trip to the [`AccessAuthority`]. Nothing is
//! cached and nothing is retried: a failed or inconclusive review is a
//! denial.
//!
//! A caller without an identity is let through without asking the
//! authority. Such calls run with the service's own cluster identity, so
//! operators must make sure anonymous traffic cannot reach a gated handler
//! unless that is intended.

use crate::client::AccessAuthority;
use crate::types::{AccessQuery, ResourceKind};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tenant_gate_core::Identity;
use tracing::{debug, error, instrument};

/// Decides whether callers may act on resources.
#[derive(Clone)]
pub struct AccessGate {
    authority: Arc<dyn AccessAuthority>,
}

impl AccessGate {
    /// Creates a gate backed by `authority`.
    #[must_use]
    pub fn new(authority: Arc<dyn AccessAuthority>) -> Self {
        Self { authority }
    }

    /// Can `identity` do `verb` on `kind` within `namespace`?
    pub async fn is_authorized(
        &self,
        identity: Option<&Identity>,
        verb: &str,
        namespace: Option<&str>,
        kind: &ResourceKind,
    ) -> bool {
        let query = AccessQuery::new(
            identity.cloned(),
            verb,
            namespace.map(str::to_string),
            kind.clone(),
        );
        self.check(&query).await
    }

    /// Evaluates a prepared query. Fails closed on any error.
    #[instrument(skip(self, query), fields(verb = %query.verb, resource = %query.kind))]
    pub async fn check(&self, query: &AccessQuery) -> bool {
        let Some(identity) = &query.identity else {
            debug!("no caller identity, skipping access review");
            return true;
        };

        match self.authority.submit(query).await {
            Ok(Some(decision)) => {
                debug!(
                    user = %identity,
                    allowed = decision.allowed,
                    reason = ?decision.reason,
                    evaluation_error = ?decision.evaluation_error,
                    "access review decided"
                );
                decision.allowed
            }
            Ok(None) => {
                error!(query = %query, "access review returned no status");
                false
            }
            Err(report) => {
                error!(
                    query = %query,
                    user = %identity,
                    namespace = ?query.namespace,
                    error = %report,
                    "error submitting access review"
                );
                false
            }
        }
    }

    /// Binds an action and resource kind, producing a guard that wraps
    /// handlers with this check.
    #[must_use]
    pub fn requires_authorization(
        &self,
        verb: impl Into<String>,
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> RequiresAuthorization {
        RequiresAuthorization {
            gate: self.clone(),
            verb: verb.into(),
            kind: ResourceKind::new(group, version, resource),
        }
    }
}

/// Per-request inputs the gate needs from the web layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestScope {
    /// The resolved caller, if any.
    pub identity: Option<Identity>,
    /// The namespace the handler acts in, if any.
    pub namespace: Option<String>,
}

impl RequestScope {
    /// Creates a scope with no namespace.
    #[must_use]
    pub fn new(identity: Option<Identity>) -> Self {
        Self {
            identity,
            namespace: None,
        }
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// The payload returned in place of a denied handler's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResult {
    /// Always `false` for denials.
    pub success: bool,
    /// Who was denied what.
    pub log: String,
}

impl HandlerResult {
    /// A denial carrying `log`.
    #[must_use]
    pub fn denied(log: impl Into<String>) -> Self {
        Self {
            success: false,
            log: log.into(),
        }
    }
}

/// Outcome of a gated handler call.
///
/// Serializes as the handler's own value when allowed, or as the
/// [`HandlerResult`] denial shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Gated<T> {
    /// The handler ran and this is its unchanged output.
    Allowed(T),
    /// The handler did not run.
    Denied(HandlerResult),
}

impl<T> Gated<T> {
    /// Returns true if the handler ran.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// Converts into a `Result`, with the denial as the error.
    pub fn into_result(self) -> Result<T, HandlerResult> {
        match self {
            Self::Allowed(value) => Ok(value),
            Self::Denied(denial) => Err(denial),
        }
    }
}

/// A gate bound to one verb and resource kind.
#[derive(Clone)]
pub struct RequiresAuthorization {
    gate: AccessGate,
    verb: String,
    kind: ResourceKind,
}

impl RequiresAuthorization {
    /// The bound verb.
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The bound resource kind.
    #[must_use]
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Checks the scope against the bound verb and kind.
    ///
    /// # Errors
    ///
    /// Returns the denial payload if the caller is not authorized.
    pub async fn authorize(&self, scope: &RequestScope) -> Result<(), HandlerResult> {
        let allowed = self
            .gate
            .is_authorized(
                scope.identity.as_ref(),
                &self.verb,
                scope.namespace.as_deref(),
                &self.kind,
            )
            .await;
        if allowed {
            Ok(())
        } else {
            Err(HandlerResult::denied(self.denial_message(scope)))
        }
    }

    /// Wraps `handler` so it only runs for authorized callers.
    #[must_use]
    pub fn wrap<H>(&self, handler: H) -> Authorized<H> {
        Authorized {
            guard: self.clone(),
            handler,
        }
    }

    fn denial_message(&self, scope: &RequestScope) -> String {
        let identity = scope.identity.as_ref().map_or("None", Identity::as_str);
        let namespace = scope.namespace.as_deref().unwrap_or("None");
        format!(
            "User {} is not authorized to {} {} for namespace: {}",
            identity, self.verb, self.kind, namespace
        )
    }
}

/// A handler wrapped by [`RequiresAuthorization::wrap`].
#[derive(Clone)]
pub struct Authorized<H> {
    guard: RequiresAuthorization,
    handler: H,
}

impl<H> Authorized<H> {
    /// Runs the handler with `args` if the scope is authorized.
    pub async fn call<A, Fut>(&self, scope: &RequestScope, args: A) -> Gated<Fut::Output>
    where
        H: Fn(A) -> Fut,
        Fut: Future,
    {
        match self.guard.authorize(scope).await {
            Ok(()) => Gated::Allowed((self.handler)(args).await),
            Err(denial) => Gated::Denied(denial),
        }
    }

    /// The guard this handler is wrapped with.
    #[must_use]
    pub fn guard(&self) -> &RequiresAuthorization {
        &self.guard
    }
}
