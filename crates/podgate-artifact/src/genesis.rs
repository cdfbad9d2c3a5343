use serde::Deserialize;
use tracing::info;

use podgate_core::error::GateError;
use podgate_core::kv::KvStore;
use podgate_core::msg::Metadata;
use podgate_core::types::Address;
use podgate_store::Model;

use crate::model::{bucket, Artifact};

/// One genesis entry of the artifact registry. Addresses are hex-encoded in
/// the genesis file.
#[derive(Clone, Debug, Deserialize)]
pub struct GenesisArtifact {
    pub image: String,
    pub checksum: String,
    pub owner: String,
}

/// Seed the artifact registry from genesis. Every entry must validate and
/// carry a fresh image; the first structural error aborts the load.
pub fn from_genesis(store: &mut dyn KvStore, entries: &[GenesisArtifact]) -> Result<(), GateError> {
    let b = bucket();
    for (i, entry) in entries.iter().enumerate() {
        let owner = Address::from_hex(&entry.owner).map_err(|e| {
            GateError::Invalid(format!("[{i}] artifact {:?}: bad owner: {e}", entry.image))
        })?;
        let artifact = Artifact {
            metadata: Metadata::new(),
            image: entry.image.clone(),
            checksum: entry.checksum.clone(),
            owner,
        };
        artifact.validate().map_err(|e| {
            GateError::Invalid(format!("[{i}] artifact {:?} is invalid: {e}", entry.image))
        })?;

        if b.has(&*store, entry.image.as_bytes())? {
            return Err(GateError::Invalid(format!(
                "[{i}] duplicate artifact {:?}",
                entry.image
            )));
        }
        b.put(store, Some(entry.image.as_bytes()), &artifact)?;
    }
    info!(count = entries.len(), "genesis: artifact registry seeded");
    Ok(())
}
