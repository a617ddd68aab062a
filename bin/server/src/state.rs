//! Shared application state.

use crate::config::IdentityConfig;
use tenant_gate_authz::{AccessGate, RequiresAuthorization};

/// Shared application state.
pub struct AppState {
    /// Authorization gate backed by the cluster's access-review API.
    pub gate: AccessGate,
    /// Guard for reading namespaces: `get` on `""/v1/namespaces`.
    pub read_namespace: RequiresAuthorization,
    /// How caller identities are read from requests.
    pub identity: IdentityConfig,
}

impl AppState {
    /// Creates a new application state, binding route guards to `gate`.
    pub fn new(gate: AccessGate, identity: IdentityConfig) -> Self {
        let read_namespace = gate.requires_authorization("get", "", "v1", "namespaces");
        Self {
            gate,
            read_namespace,
            identity,
        }
    }
}
