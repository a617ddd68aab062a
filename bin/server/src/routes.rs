//! HTTP routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tenant_gate_authz::{Gated, RequestScope, ResourceKind};
use tenant_gate_core::Identity;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::identity::CallerIdentity;
use crate::state::AppState;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/namespaces/{namespace}", get(get_namespace))
        .route("/api/access-reviews", post(create_access_review))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Turns a gated outcome into a response; denials are 403.
pub fn gated_response<T: Serialize>(outcome: Gated<T>) -> Response {
    let status = if outcome.is_allowed() {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    (status, Json(outcome)).into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

/// Namespace details visible to the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub success: bool,
    pub namespace: String,
    pub user: Option<String>,
}

async fn get_namespace(
    State(state): State<Arc<AppState>>,
    CallerIdentity(identity): CallerIdentity,
    Path(namespace): Path<String>,
) -> Response {
    let scope = RequestScope::new(identity.clone()).with_namespace(namespace.clone());
    let describe = state.read_namespace.wrap(describe_namespace);
    gated_response(describe.call(&scope, (namespace, identity)).await)
}

async fn describe_namespace((namespace, identity): (String, Option<Identity>)) -> NamespaceInfo {
    NamespaceInfo {
        success: true,
        namespace,
        user: identity.map(String::from),
    }
}

/// Body of `POST /api/access-reviews`.
#[derive(Debug, Deserialize)]
pub struct AccessReviewRequest {
    pub verb: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub resource: String,
}

/// Answer to an access review.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessReviewResponse {
    pub allowed: bool,
}

/// Asks whether the caller may perform the described action.
async fn create_access_review(
    State(state): State<Arc<AppState>>,
    CallerIdentity(identity): CallerIdentity,
    Json(request): Json<AccessReviewRequest>,
) -> Result<Json<AccessReviewResponse>, ApiError> {
    for (field, value) in [
        ("verb", &request.verb),
        ("version", &request.version),
        ("resource", &request.resource),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::InvalidRequest {
                details: format!("{} must not be empty", field),
            });
        }
    }

    let kind = ResourceKind::new(request.group, request.version, request.resource);
    let allowed = state
        .gate
        .is_authorized(
            identity.as_ref(),
            &request.verb,
            request.namespace.as_deref(),
            &kind,
        )
        .await;

    Ok(Json(AccessReviewResponse { allowed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdentityConfig;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderValue, Request};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tenant_gate_authz::{AccessAuthority, AccessGate, AccessQuery, AuthzError, Decision};
    use tower::ServiceExt;

    /// Allows alice and nobody else.
    #[derive(Default)]
    struct AliceOnly {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AccessAuthority for AliceOnly {
        async fn submit(
            &self,
            query: &AccessQuery,
        ) -> tenant_gate_core::Result<Option<Decision>, AuthzError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let allowed = query.identity.as_ref().map(|i| i.as_str()) == Some("alice");
            Ok(Some(if allowed {
                Decision::allow()
            } else {
                Decision::deny()
            }))
        }
    }

    fn alice_only_app() -> (Router, Arc<AliceOnly>) {
        let authority = Arc::new(AliceOnly::default());
        let state = Arc::new(AppState::new(
            AccessGate::new(authority.clone()),
            IdentityConfig::default(),
        ));
        (router(state), authority)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, body)
    }

    fn get_namespace_as(user: Option<&str>, namespace: &str) -> Request<Body> {
        let mut builder = Request::get(format!("/api/namespaces/{namespace}"));
        if let Some(user) = user {
            let value = HeaderValue::from_bytes(user.as_bytes()).expect("header value");
            builder = builder.header("kubeflow-userid", value);
        }
        builder.body(Body::empty()).expect("request")
    }

    fn review_as(user: &str, body: Value) -> Request<Body> {
        Request::post("/api/access-reviews")
            .header("kubeflow-userid", user)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn healthz_responds() {
        let (app, _) = alice_only_app();
        let request = Request::get("/healthz").body(Body::empty()).expect("request");
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".to_string()));
    }

    #[tokio::test]
    async fn authorized_caller_gets_handler_output() {
        let (app, authority) = alice_only_app();
        let (status, body) = send(app, get_namespace_as(Some("alice"), "team-a")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "namespace": "team-a", "user": "alice"})
        );
        assert_eq!(authority.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unauthorized_caller_gets_denial() {
        let (app, _) = alice_only_app();
        let (status, body) = send(app, get_namespace_as(Some("bob"), "team-a")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body,
            json!({
                "success": false,
                "log": "User bob is not authorized to get /v1/namespaces for namespace: team-a"
            })
        );
    }

    #[tokio::test]
    async fn anonymous_caller_skips_authority() {
        let (app, authority) = alice_only_app();
        let (status, body) = send(app, get_namespace_as(None, "team-a")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"], Value::Null);
        assert_eq!(authority.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn access_review_reports_decision() {
        let request = json!({
            "verb": "list",
            "namespace": "team-a",
            "group": "kubeflow.org",
            "version": "v1beta1",
            "resource": "notebooks"
        });

        let (app, _) = alice_only_app();
        let (status, body) = send(app, review_as("alice", request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"allowed": true}));

        let (app, _) = alice_only_app();
        let (status, body) = send(app, review_as("bob", request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"allowed": false}));
    }

    #[tokio::test]
    async fn access_review_rejects_empty_fields() {
        let (app, authority) = alice_only_app();
        let (status, body) = send(
            app,
            review_as(
                "alice",
                json!({"verb": " ", "version": "v1", "resource": "pods"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert!(body["log"].as_str().expect("log").contains("verb"));
        assert_eq!(authority.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_ascii_caller_is_reviewed() {
        let (app, authority) = alice_only_app();
        let (status, body) =
            send(app, get_namespace_as(Some("jörg@example.com"), "team-a")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body["log"],
            json!(
                "User jörg@example.com is not authorized to get /v1/namespaces for namespace: team-a"
            )
        );
        assert_eq!(authority.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_caller_header_is_rejected() {
        let (app, authority) = alice_only_app();
        let (status, body) = send(app, get_namespace_as(Some("   "), "team-a")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["user"], Value::Null);
        assert_eq!(authority.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_caller_header_is_rejected() {
        let (app, authority) = alice_only_app();
        let request = Request::get("/api/namespaces/team-a")
            .header(
                "kubeflow-userid",
                HeaderValue::from_bytes(&[0xff, 0xfe]).expect("header value"),
            )
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], json!(false));
        assert_eq!(authority.calls.load(Ordering::SeqCst), 0);
    }
}
