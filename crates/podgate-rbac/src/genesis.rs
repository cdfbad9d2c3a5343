use serde::Deserialize;
use tracing::info;

use podgate_core::error::GateError;
use podgate_core::kv::KvStore;
use podgate_core::msg::Metadata;
use podgate_core::types::{Address, RoleId};
use podgate_crypto::role_condition;

use crate::bucket::{principal_bucket, role_bucket, RoleBindingBucket, SIGNATURE_INDEX};
use crate::model::{NamedSignature, Permission, Principal, Role};

// ── Genesis file shapes ──────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
pub struct GenesisRole {
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub role_ids: Vec<u64>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenesisSignature {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenesisPrincipal {
    pub name: String,
    pub signatures: Vec<GenesisSignature>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenesisRoleBinding {
    pub role_id: u64,
    pub signature: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenesisRbac {
    #[serde(default)]
    pub roles: Vec<GenesisRole>,
    #[serde(default)]
    pub principals: Vec<GenesisPrincipal>,
    #[serde(default)]
    pub role_bindings: Vec<GenesisRoleBinding>,
}

// ── Loader ───────────────────────────────────────────────────────────────────

/// Seed roles, principals, and role bindings from genesis.
///
/// Roles are loaded first and may only reference roles that already exist,
/// so an inheritance cycle cannot be constructed. Bindings require both
/// their role and a principal carrying the signature address.
pub fn from_genesis(store: &mut dyn KvStore, genesis: &GenesisRbac) -> Result<(), GateError> {
    add_roles(store, &genesis.roles)?;
    add_principals(store, &genesis.principals)?;
    add_role_bindings(store, &genesis.role_bindings)?;
    info!(
        roles = genesis.roles.len(),
        principals = genesis.principals.len(),
        bindings = genesis.role_bindings.len(),
        "genesis: rbac seeded"
    );
    Ok(())
}

fn add_roles(store: &mut dyn KvStore, roles: &[GenesisRole]) -> Result<(), GateError> {
    let bucket = role_bucket();
    for (i, entry) in roles.iter().enumerate() {
        let id = RoleId(bucket.next_seq(store)?);

        let mut role_ids = Vec::with_capacity(entry.role_ids.len());
        for &dep in &entry.role_ids {
            let dep = RoleId(dep);
            if !bucket.has(&*store, &dep.to_key())? {
                return Err(GateError::Human(format!(
                    "role dependency does not exist: id {dep} required for {:?}",
                    entry.name
                )));
            }
            role_ids.push(dep);
        }

        let role = Role {
            metadata: Metadata::new(),
            id,
            name: entry.name.clone(),
            owner: Address::from_hex(&entry.owner)
                .map_err(|e| GateError::Invalid(format!("[{i}] role owner: {e}")))?,
            address: role_condition(id),
            role_ids,
            permissions: entry.permissions.iter().map(Permission::new).collect(),
        };
        bucket
            .put(store, Some(&id.to_key()), &role)
            .map_err(|e| GateError::Invalid(format!("cannot save #{i} role: {e}")))?;
    }
    Ok(())
}

fn add_principals(
    store: &mut dyn KvStore,
    principals: &[GenesisPrincipal],
) -> Result<(), GateError> {
    let bucket = principal_bucket();
    for (i, entry) in principals.iter().enumerate() {
        let mut signatures = Vec::with_capacity(entry.signatures.len());
        for sig in &entry.signatures {
            signatures.push(NamedSignature {
                name: sig.name.clone(),
                description: sig.description.clone(),
                address: Address::from_hex(&sig.address)
                    .map_err(|e| GateError::Invalid(format!("[{i}] principal signature: {e}")))?,
            });
        }
        let principal = Principal {
            metadata: Metadata::new(),
            name: entry.name.clone(),
            signatures,
        };
        bucket
            .put(store, None, &principal)
            .map_err(|e| GateError::Invalid(format!("cannot save #{i} principal: {e}")))?;
    }
    Ok(())
}

fn add_role_bindings(
    store: &mut dyn KvStore,
    bindings: &[GenesisRoleBinding],
) -> Result<(), GateError> {
    let roles = role_bucket();
    let principals = principal_bucket();
    let binding_bucket = RoleBindingBucket::new();

    for (i, entry) in bindings.iter().enumerate() {
        let role_id = RoleId(entry.role_id);
        if !roles.has(&*store, &role_id.to_key())? {
            return Err(GateError::Human(format!(
                "role dependency does not exist: id {role_id} required for binding #{i}"
            )));
        }

        let signature = Address::from_hex(&entry.signature)
            .map_err(|e| GateError::Invalid(format!("[{i}] binding signature: {e}")))?;
        let owners = principals.by_index(&*store, SIGNATURE_INDEX, signature.as_bytes())?;
        if owners.is_empty() {
            return Err(GateError::Human(format!(
                "principal dependency does not exist: signature {signature} required for binding #{i}"
            )));
        }

        binding_bucket.create(store, role_id, signature)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use podgate_core::error::ErrorKind;
    use podgate_store::MemStore;

    fn addr_hex(n: u8) -> String {
        hex::encode([n; 20])
    }

    fn genesis() -> GenesisRbac {
        GenesisRbac {
            roles: vec![
                GenesisRole {
                    name: "admin".into(),
                    owner: addr_hex(1),
                    role_ids: vec![],
                    permissions: vec!["_podgate.*".into()],
                },
                GenesisRole {
                    name: "devops".into(),
                    owner: addr_hex(1),
                    role_ids: vec![1],
                    permissions: vec![],
                },
            ],
            principals: vec![GenesisPrincipal {
                name: "alice".into(),
                signatures: vec![GenesisSignature {
                    name: "alice-key".into(),
                    description: String::new(),
                    address: addr_hex(2),
                }],
            }],
            role_bindings: vec![GenesisRoleBinding {
                role_id: 1,
                signature: addr_hex(2),
            }],
        }
    }

    #[test]
    fn loads_roles_principals_and_bindings() {
        let mut store = MemStore::new();
        from_genesis(&mut store, &genesis()).unwrap();

        let admin = role_bucket().one(&store, &RoleId(1).to_key()).unwrap();
        assert_eq!(admin.name, "admin");
        assert_eq!(admin.address, role_condition(RoleId(1)));

        let devops = role_bucket().one(&store, &RoleId(2).to_key()).unwrap();
        assert_eq!(devops.role_ids, vec![RoleId(1)]);

        let ids = RoleBindingBucket::new()
            .find_role_ids_by_address(&store, &Address::from_hex(&addr_hex(2)).unwrap())
            .unwrap();
        assert_eq!(ids, vec![RoleId(1)]);
    }

    #[test]
    fn forward_role_reference_is_rejected() {
        let mut store = MemStore::new();
        let mut g = genesis();
        // First role inherits an id that does not exist yet.
        g.roles[0].role_ids = vec![2];
        let err = from_genesis(&mut store, &g).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Human);
    }

    #[test]
    fn binding_requires_known_role() {
        let mut store = MemStore::new();
        let mut g = genesis();
        g.role_bindings[0].role_id = 99;
        let err = from_genesis(&mut store, &g).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Human);
    }

    #[test]
    fn binding_requires_principal_signature() {
        let mut store = MemStore::new();
        let mut g = genesis();
        g.role_bindings[0].signature = addr_hex(9);
        let err = from_genesis(&mut store, &g).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Human);
    }
}
