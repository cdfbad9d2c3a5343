use tracing::info;

use podgate_core::constants::{CREATE_ARTIFACT_COST, DELETE_ARTIFACT_COST};
use podgate_core::context::AuthContext;
use podgate_core::error::GateError;
use podgate_core::handler::{CheckResult, DeliverResult, Handler};
use podgate_core::kv::KvStore;
use podgate_core::msg::{CreateArtifactMsg, DeleteArtifactMsg, Metadata, Msg};
use podgate_core::tx::Tx;
use podgate_core::types::Address;

use podgate_engine::router::Router;

use crate::model::{bucket, Artifact};

/// Register artifact message handlers with the dispatch table.
pub fn register_routes(r: &mut Router) {
    r.handle("artifacts/create", Box::new(CreateArtifactHandler::new()));
    r.handle("artifacts/delete", Box::new(DeleteArtifactHandler::new()));
}

// ── CreateArtifactHandler ────────────────────────────────────────────────────

pub struct CreateArtifactHandler {
    bucket: podgate_store::ModelBucket<Artifact>,
}

impl CreateArtifactHandler {
    pub fn new() -> Self {
        Self { bucket: bucket() }
    }

    /// Common pre-processing between Check and Deliver. Returns the message
    /// with the owner resolved: an explicit owner must be present in the
    /// auth context, an empty one is assigned to the main signer.
    fn validate(
        &self,
        ctx: &AuthContext,
        tx: &Tx,
    ) -> Result<(CreateArtifactMsg, Address), GateError> {
        let msg = match &tx.msg {
            Msg::CreateArtifact(m) => m.clone(),
            other => {
                return Err(GateError::Invalid(format!(
                    "unexpected message for route: {}",
                    other.path()
                )))
            }
        };
        msg.validate()?;

        let owner = match msg.owner {
            Some(owner) => {
                if !ctx.has_address(&owner) {
                    return Err(GateError::Unauthorized("owner's signature required".into()));
                }
                owner
            }
            None => ctx
                .main_signer()
                .ok_or_else(|| GateError::Unauthorized("transaction has no signer".into()))?,
        };
        Ok((msg, owner))
    }
}

impl Default for CreateArtifactHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for CreateArtifactHandler {
    fn check(
        &self,
        ctx: &AuthContext,
        _store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<CheckResult, GateError> {
        self.validate(ctx, tx)?;
        Ok(CheckResult::with_gas(CREATE_ARTIFACT_COST))
    }

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<DeliverResult, GateError> {
        let (msg, owner) = self.validate(ctx, tx)?;

        let artifact = Artifact {
            metadata: Metadata::new(),
            image: msg.image.clone(),
            checksum: msg.checksum,
            owner,
        };
        self.bucket
            .put(store, Some(msg.image.as_bytes()), &artifact)?;
        info!(image = %msg.image, owner = %owner, "stored artifact");

        Ok(DeliverResult::with_data(msg.image.into_bytes()))
    }
}

// ── DeleteArtifactHandler ────────────────────────────────────────────────────

pub struct DeleteArtifactHandler {
    bucket: podgate_store::ModelBucket<Artifact>,
}

impl DeleteArtifactHandler {
    pub fn new() -> Self {
        Self { bucket: bucket() }
    }

    /// Loads the artifact and requires its owner in the auth context.
    fn validate(
        &self,
        ctx: &AuthContext,
        store: &dyn KvStore,
        tx: &Tx,
    ) -> Result<DeleteArtifactMsg, GateError> {
        let msg = match &tx.msg {
            Msg::DeleteArtifact(m) => m.clone(),
            other => {
                return Err(GateError::Invalid(format!(
                    "unexpected message for route: {}",
                    other.path()
                )))
            }
        };
        msg.validate()?;

        let artifact = self.bucket.one(store, msg.image.as_bytes())?;
        if !ctx.has_address(&artifact.owner) {
            return Err(GateError::Unauthorized("owner's signature required".into()));
        }
        Ok(msg)
    }
}

impl Default for DeleteArtifactHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for DeleteArtifactHandler {
    fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<CheckResult, GateError> {
        self.validate(ctx, store, tx)?;
        Ok(CheckResult::with_gas(DELETE_ARTIFACT_COST))
    }

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<DeliverResult, GateError> {
        let msg = self.validate(ctx, store, tx)?;
        self.bucket.delete(store, msg.image.as_bytes())?;
        info!(image = %msg.image, "deleted artifact");
        Ok(DeliverResult::default())
    }
}
