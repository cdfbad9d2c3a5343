//! Kubernetes `AdmissionReview` wire types, covering the v1 and v1beta1
//! shapes this webhook accepts. Only the fields the validator reads are
//! modeled; everything else passes through serde defaults.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const JSON_CONTENT_TYPE: &str = "application/json";

pub const SUCCESS_MESSAGE: &str = "Successfully admitted.";

// ── Review envelope ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

impl AdmissionReview {
    /// The response envelope mirrors the request's apiVersion so v1beta1
    /// clients get a v1beta1 reply.
    pub fn respond(&self, response: AdmissionResponse) -> AdmissionReview {
        AdmissionReview {
            api_version: if self.api_version.is_empty() {
                "admission.k8s.io/v1".to_string()
            } else {
                self.api_version.clone()
            },
            kind: "AdmissionReview".to_string(),
            request: None,
            response: Some(response),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub kind: GroupVersionKind,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    #[serde(default)]
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl AdmissionResponse {
    pub fn new(uid: &str, allowed: bool, code: u16, message: impl Into<String>) -> Self {
        Self {
            uid: uid.to_string(),
            allowed,
            status: Some(Status {
                code,
                message: message.into(),
            }),
        }
    }
}

/// The `metav1.Status` subset carried in the response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

// ── Pod ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    #[serde(default)]
    pub spec: PodSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub init_containers: Vec<Container>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
}

impl Pod {
    /// The distinct images across containers and init containers, in a
    /// deterministic order.
    pub fn images(&self) -> BTreeSet<String> {
        self.spec
            .containers
            .iter()
            .chain(self.spec.init_containers.iter())
            .map(|c| c.image.clone())
            .filter(|image| !image.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_are_distinct_union() {
        let pod: Pod = serde_json::from_value(serde_json::json!({
            "spec": {
                "containers": [
                    {"name": "app", "image": "foo/bar:v0.0.1"},
                    {"name": "sidecar", "image": "foo/bar:v0.0.1"}
                ],
                "initContainers": [
                    {"name": "init", "image": "init/tool:v1"}
                ]
            }
        }))
        .unwrap();
        let images = pod.images();
        assert_eq!(images.len(), 2);
        assert!(images.contains("foo/bar:v0.0.1"));
        assert!(images.contains("init/tool:v1"));
    }

    #[test]
    fn review_parses_v1beta1_payload() {
        let review: AdmissionReview = serde_json::from_value(serde_json::json!({
            "apiVersion": "admission.k8s.io/v1beta1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "abc-123",
                "kind": {"kind": "Pod"},
                "namespace": "default",
                "operation": "CREATE",
                "object": {"spec": {"containers": []}}
            }
        }))
        .unwrap();
        let req = review.request.as_ref().unwrap();
        assert_eq!(req.uid, "abc-123");
        assert_eq!(req.kind.kind, "Pod");

        let resp = review.respond(AdmissionResponse::new("abc-123", true, 200, SUCCESS_MESSAGE));
        assert_eq!(resp.api_version, "admission.k8s.io/v1beta1");
        assert!(resp.response.unwrap().allowed);
    }
}
