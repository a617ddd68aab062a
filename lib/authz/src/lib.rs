//! Request-level authorization for tenant-gate.
//!
//! Decisions are delegated to the cluster's access-review authority (the
//! Kubernetes `SubjectAccessReview` API); this crate keeps no policy of its
//! own. [`AccessGate`] answers single questions and wraps handlers so they
//! only run for authorized callers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tenant_gate_authz::{
//!     AccessGate, AuthorityOptions, ClusterCredentials, Gated, KubeAuthority, RequestScope,
//! };
//! use tenant_gate_core::Identity;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = ClusterCredentials::load(None).map_err(|e| e.to_string())?;
//! let authority = KubeAuthority::new(&credentials, AuthorityOptions::default())
//!     .map_err(|e| e.to_string())?;
//! let gate = AccessGate::new(Arc::new(authority));
//!
//! let list_notebooks = gate
//!     .requires_authorization("list", "kubeflow.org", "v1", "notebooks")
//!     .wrap(|namespace: String| async move { vec![format!("{namespace}/nb-1")] });
//!
//! let scope = RequestScope::new(Some(Identity::new("alice")?)).with_namespace("team-a");
//! match list_notebooks.call(&scope, "team-a".to_string()).await {
//!     Gated::Allowed(notebooks) => println!("{notebooks:?}"),
//!     Gated::Denied(denial) => println!("{}", denial.log),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod credentials;
mod error;
mod gate;
mod review;
mod types;

pub use client::{AccessAuthority, AuthorityOptions, KubeAuthority};
pub use credentials::{ClientAuth, ClusterCredentials, SERVICE_ACCOUNT_DIR};
pub use error::AuthzError;
pub use gate::{AccessGate, Authorized, Gated, HandlerResult, RequestScope, RequiresAuthorization};
pub use review::{
    ResourceAttributes, SubjectAccessReview, SubjectAccessReviewSpec, SubjectAccessReviewStatus,
};
pub use types::{AccessQuery, Decision, ResourceKind};
