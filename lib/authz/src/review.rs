//! `SubjectAccessReview` wire format (`authorization.k8s.io/v1`).

use crate::types::{AccessQuery, Decision};
use serde::{Deserialize, Serialize};

/// API version of the review resource.
pub const API_VERSION: &str = "authorization.k8s.io/v1";

/// Kind of the review resource.
pub const KIND: &str = "SubjectAccessReview";

/// Collection path relative to the API server root.
pub const REVIEWS_PATH: &str = "/apis/authorization.k8s.io/v1/subjectaccessreviews";

/// A review request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAccessReview {
    /// Always [`API_VERSION`] on requests.
    #[serde(default)]
    pub api_version: String,
    /// Always [`KIND`] on requests.
    #[serde(default)]
    pub kind: String,
    /// What is being asked.
    pub spec: SubjectAccessReviewSpec,
    /// The answer. Only present on responses, and not guaranteed even then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubjectAccessReviewStatus>,
}

/// The question part of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAccessReviewSpec {
    /// The user being checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// The action and target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_attributes: Option<ResourceAttributes>,
}

/// Action and target of a resource review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAttributes {
    /// Omitted for cluster-scoped resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Action keyword.
    #[serde(default)]
    pub verb: String,
    /// API group; the empty string is the core group and is still sent.
    #[serde(default)]
    pub group: String,
    /// API version.
    #[serde(default)]
    pub version: String,
    /// Plural resource name.
    #[serde(default)]
    pub resource: String,
}

/// The answer part of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAccessReviewStatus {
    #[serde(default)]
    pub allowed: bool,
    #[serde(default)]
    pub denied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_error: Option<String>,
}

impl SubjectAccessReview {
    /// Builds the review request for a query.
    #[must_use]
    pub fn for_query(query: &AccessQuery) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            spec: SubjectAccessReviewSpec {
                user: query.identity.as_ref().map(|i| i.as_str().to_string()),
                resource_attributes: Some(ResourceAttributes {
                    namespace: query.namespace.clone(),
                    verb: query.verb.clone(),
                    group: query.kind.group.clone(),
                    version: query.kind.version.clone(),
                    resource: query.kind.resource.clone(),
                }),
            },
            status: None,
        }
    }

    /// The decision carried by this review, if the authority filled one in.
    #[must_use]
    pub fn decision(&self) -> Option<Decision> {
        self.status.as_ref().map(|status| Decision {
            allowed: status.allowed,
            denied: status.denied,
            reason: status.reason.clone(),
            evaluation_error: status.evaluation_error.clone(),
        })
    }
}
