//! Web service that gates tenant requests through cluster access reviews.
//!
//! The caller identity is taken from a header set by the auth proxy, and
//! every gated route asks the cluster's `SubjectAccessReview` API whether
//! that caller may perform the route's action.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
