//! Authorization types for access reviews.

use std::fmt;
use tenant_gate_core::Identity;

/// Coordinates of a resource kind in the cluster's API scheme.
///
/// The core API group is the empty string, so `""/v1/namespaces` displays
/// as `/v1/namespaces`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    /// API group, e.g. `kubeflow.org`. Empty for the core group.
    pub group: String,
    /// API version, e.g. `v1beta1`.
    pub version: String,
    /// Plural resource name, e.g. `notebooks`.
    pub resource: String,
}

impl ResourceKind {
    /// Creates a resource kind.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// A resource in the core (`""`) API group.
    #[must_use]
    pub fn core(version: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new("", version, resource)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.resource)
    }
}

/// "Can `identity` do `verb` on `kind` within `namespace`?"
///
/// Built fresh for every check and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessQuery {
    /// The caller. `None` bypasses the authority entirely.
    pub identity: Option<Identity>,
    /// Action keyword, e.g. `get`, `list`, `create`.
    pub verb: String,
    /// Target namespace, `None` for cluster-scoped resources.
    pub namespace: Option<String>,
    /// The resource kind being acted on.
    pub kind: ResourceKind,
}

impl AccessQuery {
    /// Creates a query.
    #[must_use]
    pub fn new(
        identity: Option<Identity>,
        verb: impl Into<String>,
        namespace: Option<String>,
        kind: ResourceKind,
    ) -> Self {
        Self {
            identity,
            verb: verb.into(),
            namespace,
            kind,
        }
    }
}

impl fmt::Display for AccessQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identity = self.identity.as_ref().map_or("<anonymous>", Identity::as_str);
        let namespace = self.namespace.as_deref().unwrap_or("<cluster>");
        write!(
            f,
            "{} {} {} in {}",
            identity, self.verb, self.kind, namespace
        )
    }
}

/// The authority's verdict for a single query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the action is permitted.
    pub allowed: bool,
    /// Whether the action was explicitly denied (as opposed to no opinion).
    pub denied: bool,
    /// Human-readable explanation from the authority, if any.
    pub reason: Option<String>,
    /// Set when the authority hit an error while evaluating the query.
    pub evaluation_error: Option<String>,
}

impl Decision {
    /// A bare allow.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            denied: false,
            reason: None,
            evaluation_error: None,
        }
    }

    /// A bare deny.
    #[must_use]
    pub fn deny() -> Self {
        Self {
            allowed: false,
            denied: true,
            reason: None,
            evaluation_error: None,
        }
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_display_includes_empty_group() {
        let kind = ResourceKind::core("v1", "notebooks");
        assert_eq!(kind.to_string(), "/v1/notebooks");

        let kind = ResourceKind::new("kubeflow.org", "v1beta1", "notebooks");
        assert_eq!(kind.to_string(), "kubeflow.org/v1beta1/notebooks");
    }

    #[test]
    fn query_display_names_all_coordinates() {
        let query = AccessQuery::new(
            Some(Identity::new("alice").expect("valid identity")),
            "list",
            Some("team-a".to_string()),
            ResourceKind::core("v1", "pods"),
        );
        assert_eq!(query.to_string(), "alice list /v1/pods in team-a");

        let query = AccessQuery::new(None, "get", None, ResourceKind::core("v1", "nodes"));
        assert_eq!(query.to_string(), "<anonymous> get /v1/nodes in <cluster>");
    }

    #[test]
    fn decision_constructors() {
        assert!(Decision::allow().allowed);
        let deny = Decision::deny().with_reason("no RBAC policy matched");
        assert!(!deny.allowed);
        assert!(deny.denied);
        assert_eq!(deny.reason.as_deref(), Some("no RBAC policy matched"));
    }
}
