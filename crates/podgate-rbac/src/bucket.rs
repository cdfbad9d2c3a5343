use podgate_core::error::GateError;
use podgate_core::kv::{KvRead, KvStore};
use podgate_core::msg::Metadata;
use podgate_core::types::{Address, RoleId, ADDRESS_LENGTH};
use podgate_store::bucket::db_key;
use podgate_store::ModelBucket;

use crate::model::{Principal, Role, RoleBinding};

pub const ROLE_BUCKET_NAME: &str = "role";
pub const PRINCIPAL_BUCKET_NAME: &str = "principal";
pub const ROLEBIND_BUCKET_NAME: &str = "rolebind";
pub const SIGNATURE_INDEX: &str = "signature";

/// Roles keyed by their 8-byte big-endian sequence id.
pub fn role_bucket() -> ModelBucket<Role> {
    ModelBucket::new(ROLE_BUCKET_NAME).with_sequence()
}

fn signature_index(p: &Principal) -> Vec<Vec<u8>> {
    p.signatures
        .iter()
        .map(|s| s.address.as_bytes().to_vec())
        .collect()
}

/// Principals keyed by sequence id, with the unique signature-address index.
pub fn principal_bucket() -> ModelBucket<Principal> {
    ModelBucket::new(PRINCIPAL_BUCKET_NAME)
        .with_sequence()
        .with_index(SIGNATURE_INDEX, signature_index, true)
}

// ── RoleBindingBucket ────────────────────────────────────────────────────────

/// Role bindings live outside the model-bucket machinery: the 28-byte
/// `signature || role_id` key IS the record, the stored value is an empty
/// marker. A prefix scan by signature address enumerates the bound roles.
pub struct RoleBindingBucket;

impl RoleBindingBucket {
    pub fn new() -> Self {
        Self
    }

    fn build_key(signature: &Address, role_id: RoleId) -> Vec<u8> {
        let mut key = Vec::with_capacity(ADDRESS_LENGTH + 8);
        key.extend_from_slice(signature.as_bytes());
        key.extend_from_slice(&role_id.to_key());
        key
    }

    /// Store a binding; returns the 28-byte key.
    pub fn create(
        &self,
        store: &mut dyn KvStore,
        role_id: RoleId,
        signature: Address,
    ) -> Result<Vec<u8>, GateError> {
        let key = Self::build_key(&signature, role_id);
        store.put(&db_key(ROLEBIND_BUCKET_NAME, &key), b"")?;
        Ok(key)
    }

    pub fn has(
        &self,
        store: &dyn KvRead,
        role_id: RoleId,
        signature: &Address,
    ) -> Result<bool, GateError> {
        store.has(&db_key(
            ROLEBIND_BUCKET_NAME,
            &Self::build_key(signature, role_id),
        ))
    }

    pub fn delete(
        &self,
        store: &mut dyn KvStore,
        role_id: RoleId,
        signature: &Address,
    ) -> Result<(), GateError> {
        let key = db_key(ROLEBIND_BUCKET_NAME, &Self::build_key(signature, role_id));
        if !store.has(&key)? {
            return Err(GateError::NotFound("role binding not in the store".into()));
        }
        store.delete(&key)
    }

    /// All role ids bound to `address`, in ascending id order (the scan is
    /// lexicographic and ids are big-endian).
    pub fn find_role_ids_by_address(
        &self,
        store: &dyn KvRead,
        address: &Address,
    ) -> Result<Vec<RoleId>, GateError> {
        let prefix = db_key(ROLEBIND_BUCKET_NAME, address.as_bytes());
        let mut out = Vec::new();
        for (key, _) in store.prefix_scan(&prefix)? {
            out.push(RoleId::from_key(&key[prefix.len()..])?);
        }
        Ok(out)
    }

    /// Reconstruct the typed record for one binding key (used by genesis
    /// validation and display).
    pub fn record(key: &[u8]) -> Result<RoleBinding, GateError> {
        if key.len() != ADDRESS_LENGTH + 8 {
            return Err(GateError::Invalid(format!(
                "role binding key must be {} bytes, got {}",
                ADDRESS_LENGTH + 8,
                key.len()
            )));
        }
        Ok(RoleBinding {
            metadata: Metadata::new(),
            signature: Address::try_from(&key[..ADDRESS_LENGTH])?,
            role_id: RoleId::from_key(&key[ADDRESS_LENGTH..])?,
        })
    }
}

impl Default for RoleBindingBucket {
    fn default() -> Self {
        Self::new()
    }
}
