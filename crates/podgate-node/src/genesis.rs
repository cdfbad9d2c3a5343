use std::path::Path;

use serde::Deserialize;
use tracing::info;

use podgate_artifact::GenesisArtifact;
use podgate_core::error::GateError;
use podgate_core::kv::KvStore;
use podgate_rbac::GenesisRbac;

/// The genesis file: chain identity plus the initial artifact registry and
/// RBAC state.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenesisFile {
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<GenesisArtifact>,
    #[serde(default)]
    pub rbac: GenesisRbac,
}

pub fn load_genesis(path: &Path) -> anyhow::Result<GenesisFile> {
    let raw = std::fs::read(path)?;
    let genesis = serde_json::from_slice(&raw)?;
    Ok(genesis)
}

/// Seed an empty store. Writes go directly to the store, bypassing the
/// transaction engine: genesis is the founding document, there is nothing
/// to authorize it against.
pub fn apply_genesis(store: &mut dyn KvStore, genesis: &GenesisFile) -> Result<(), GateError> {
    podgate_rbac::from_genesis(store, &genesis.rbac)?;
    podgate_artifact::from_genesis(store, &genesis.artifacts)?;
    info!("genesis applied");
    Ok(())
}
