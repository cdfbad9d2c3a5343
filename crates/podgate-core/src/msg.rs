use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_IMAGE_LENGTH;
use crate::error::GateError;
use crate::types::Address;

// ── Metadata ─────────────────────────────────────────────────────────────────

/// Schema version carried by every persisted entity and message, used for
/// data migrations between releases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub schema: u32,
}

impl Metadata {
    pub fn new() -> Self {
        Self { schema: 1 }
    }

    pub fn validate(&self) -> Result<(), GateError> {
        if self.schema == 0 {
            return Err(GateError::Invalid("metadata schema must be >= 1".into()));
        }
        Ok(())
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

// ── Checksum grammar ─────────────────────────────────────────────────────────

/// A checksum is either a bare 16..=64 alphanumeric token or `algo:hex`
/// (lowercase algo, 16..=128 hex digits).
static IS_CHECKSUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-zA-Z]{16,64}|[a-z0-9]+:[0-9a-f]{16,128})$").unwrap());

pub fn is_checksum(s: &str) -> bool {
    IS_CHECKSUM.is_match(s)
}

fn validate_image(image: &str) -> Result<(), GateError> {
    match image.len() {
        0 => Err(GateError::Invalid("image must not be empty".into())),
        l if l > MAX_IMAGE_LENGTH => Err(GateError::Invalid(format!(
            "image must not exceed {MAX_IMAGE_LENGTH} bytes"
        ))),
        _ => Ok(()),
    }
}

// ── Messages ─────────────────────────────────────────────────────────────────

/// Register a container image reference in the admission registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateArtifactMsg {
    pub metadata: Metadata,
    pub image: String,
    pub checksum: String,
    /// Owning address. When unset, the main signer becomes the owner.
    pub owner: Option<Address>,
}

impl CreateArtifactMsg {
    pub fn validate(&self) -> Result<(), GateError> {
        self.metadata.validate()?;
        validate_image(&self.image)?;
        if !is_checksum(&self.checksum) {
            return Err(GateError::Invalid(format!(
                "checksum {:?} does not match the checksum grammar",
                self.checksum
            )));
        }
        Ok(())
    }
}

/// Remove a container image reference from the admission registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteArtifactMsg {
    pub metadata: Metadata,
    pub image: String,
}

impl DeleteArtifactMsg {
    pub fn validate(&self) -> Result<(), GateError> {
        self.metadata.validate()?;
        validate_image(&self.image)
    }
}

// ── Msg ──────────────────────────────────────────────────────────────────────

/// Every state-changing operation is one of these variants. Dispatch happens
/// over [`Msg::path`] in the message router.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Msg {
    CreateArtifact(CreateArtifactMsg),
    DeleteArtifact(DeleteArtifactMsg),
}

impl Msg {
    /// Routing path, also the source of the required permission
    /// (lowercased, `/` replaced by `.`, domain tag prefixed).
    pub fn path(&self) -> &'static str {
        match self {
            Msg::CreateArtifact(_) => "artifacts/create",
            Msg::DeleteArtifact(_) => "artifacts/delete",
        }
    }

    pub fn validate(&self) -> Result<(), GateError> {
        match self {
            Msg::CreateArtifact(m) => m.validate(),
            Msg::DeleteArtifact(m) => m.validate(),
        }
    }

    /// Canonical byte encoding covered by transaction signatures.
    pub fn encode(&self) -> Result<Vec<u8>, GateError> {
        bincode::serialize(self).map_err(|e| GateError::Serialization(e.to_string()))
    }
}
