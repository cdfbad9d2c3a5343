use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use podgate_core::error::{ErrorKind, GateError};
use podgate_core::kv::KvRead;
use podgate_engine::query::QueryRouter;

use crate::admission::{
    AdmissionResponse, AdmissionReview, Pod, SUCCESS_MESSAGE,
};

const QUERY_BY_IMAGE: &str = "/artifacts";

/// Validates pod admission requests against the committed artifact
/// registry. Read-only: a cancelled or failed request leaves no state
/// behind.
pub struct PodValidator<S> {
    store: S,
    query: Arc<QueryRouter>,
    /// Namespaces that bypass validation entirely.
    namespace_blacklist: BTreeSet<String>,
}

impl<S: KvRead> PodValidator<S> {
    pub fn new(store: S, query: Arc<QueryRouter>, namespace_blacklist: BTreeSet<String>) -> Self {
        Self {
            store,
            query,
            namespace_blacklist,
        }
    }

    /// Produce the response review for one admission review.
    pub fn review(&self, review: &AdmissionReview) -> AdmissionReview {
        let Some(request) = &review.request else {
            return review.respond(AdmissionResponse::new(
                "",
                false,
                400,
                "admission request is empty",
            ));
        };
        let uid = request.uid.as_str();
        debug!(uid, kind = %request.kind.kind, "starting pod admission");

        if self.namespace_blacklist.contains(&request.namespace) {
            info!(uid, namespace = %request.namespace, "namespace blacklisted, skipping validation");
            return review.respond(AdmissionResponse::new(
                uid,
                true,
                200,
                format!("namespace {:?} is blacklisted", request.namespace),
            ));
        }

        if request.kind.kind != "Pod" {
            return review.respond(AdmissionResponse::new(
                uid,
                true,
                200,
                format!("no rule for kind {:?}", request.kind.kind),
            ));
        }

        if !matches!(request.operation.as_str(), "CREATE" | "UPDATE") {
            return review.respond(AdmissionResponse::new(
                uid,
                true,
                200,
                format!("no rule for operation {:?}", request.operation),
            ));
        }

        let pod: Pod = match request
            .object
            .clone()
            .map(serde_json::from_value)
            .transpose()
        {
            Ok(Some(pod)) => pod,
            Ok(None) => {
                return review.respond(AdmissionResponse::new(
                    uid,
                    false,
                    400,
                    "request object must not be empty",
                ))
            }
            Err(err) => {
                return review.respond(AdmissionResponse::new(
                    uid,
                    false,
                    400,
                    format!("cannot decode pod: {err}"),
                ))
            }
        };

        match self.check_images(&pod.images()) {
            Ok(()) => review.respond(AdmissionResponse::new(uid, true, 200, SUCCESS_MESSAGE)),
            Err(err) => {
                let code = err.kind().http_status();
                warn!(uid, code, error = %err, "pod admission denied");
                review.respond(AdmissionResponse::new(uid, false, code, err.to_string()))
            }
        }
    }

    fn check_images(&self, images: &BTreeSet<String>) -> Result<(), GateError> {
        for image in images {
            debug!(image = %image, "inspecting container image");
            let result = self
                .query
                .query(&self.store, QUERY_BY_IMAGE, image.as_bytes())
                .map_err(|e| match e.kind() {
                    // A routing mistake is ours, not the caller's.
                    ErrorKind::NotFound => GateError::Human(e.to_string()),
                    _ => e,
                })?;
            if result.is_empty() {
                return Err(GateError::NotFound(format!("image not admitted: {image}")));
            }
        }
        Ok(())
    }
}
