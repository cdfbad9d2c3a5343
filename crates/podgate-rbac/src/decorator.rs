use std::collections::BTreeMap;

use tracing::debug;

use podgate_core::constants::{PERMISSION_DOMAIN, ROLE_PARTICIPANT_GAS_COST};
use podgate_core::context::AuthContext;
use podgate_core::error::GateError;
use podgate_core::handler::{CheckResult, Decorator, DeliverResult, Handler};
use podgate_core::kv::{KvRead, KvStore};
use podgate_core::tx::Tx;
use podgate_core::types::RoleId;
use podgate_store::ModelBucket;

use crate::bucket::{role_bucket, RoleBindingBucket};
use crate::model::{Permission, Role};

// ── AuthN ────────────────────────────────────────────────────────────────────

/// Expands the signer addresses into the transitive closure of their role
/// bindings. Every reached role contributes its permissions and its role
/// condition address to a new context; each one charges
/// [`ROLE_PARTICIPANT_GAS_COST`] into the Check result.
pub struct AuthNDecorator {
    role_bucket: ModelBucket<Role>,
    binding_bucket: RoleBindingBucket,
}

impl AuthNDecorator {
    pub fn new() -> Self {
        Self {
            role_bucket: role_bucket(),
            binding_bucket: RoleBindingBucket::new(),
        }
    }

    fn auth_roles(
        &self,
        ctx: &AuthContext,
        store: &dyn KvRead,
    ) -> Result<(AuthContext, u64), GateError> {
        let mut reached: BTreeMap<RoleId, Role> = BTreeMap::new();
        let mut cost = 0u64;

        for signer in ctx.signers() {
            for role_id in self.binding_bucket.find_role_ids_by_address(store, signer)? {
                self.load_roles(store, role_id, &mut reached, &mut cost)?;
            }
        }

        if reached.is_empty() {
            return Ok((ctx.clone(), 0));
        }

        let mut ctx = ctx.clone();
        ctx.add_conditions(reached.values().map(|r| r.address));
        ctx.add_permissions(
            reached
                .values()
                .flat_map(|r| r.permissions.iter().map(|p| p.0.clone())),
        );
        debug!(roles = reached.len(), "expanded role bindings");
        Ok((ctx, cost))
    }

    /// Depth-first resolution over `role_ids`. The visited map makes the
    /// walk terminate on any graph, cyclic stores included, and bounds the
    /// gas at one charge per role.
    fn load_roles(
        &self,
        store: &dyn KvRead,
        role_id: RoleId,
        reached: &mut BTreeMap<RoleId, Role>,
        cost: &mut u64,
    ) -> Result<(), GateError> {
        if reached.contains_key(&role_id) {
            return Ok(());
        }
        let role = self.role_bucket.one(store, &role_id.to_key())?;
        *cost += ROLE_PARTICIPANT_GAS_COST;
        let inherited = role.role_ids.clone();
        reached.insert(role_id, role);

        for sub in inherited {
            self.load_roles(store, sub, reached, cost)?;
        }
        Ok(())
    }
}

impl Default for AuthNDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl Decorator for AuthNDecorator {
    fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<CheckResult, GateError> {
        let (ctx, cost) = self.auth_roles(ctx, &*store)?;
        let mut res = next.check(&ctx, store, tx)?;
        res.gas_payment += cost;
        Ok(res)
    }

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<DeliverResult, GateError> {
        let (ctx, _) = self.auth_roles(ctx, &*store)?;
        next.deliver(&ctx, store, tx)
    }
}

// ── AuthZ ────────────────────────────────────────────────────────────────────

/// Derives the required permission from the message route and tests the
/// context's permission set for a grant, exact or wildcard.
pub struct AuthZDecorator {
    permission_prefix: &'static str,
}

impl AuthZDecorator {
    pub fn new() -> Self {
        Self {
            permission_prefix: PERMISSION_DOMAIN,
        }
    }

    fn resolve_permission(&self, tx: &Tx) -> Permission {
        let normalized = tx.msg.path().to_lowercase().replace('/', ".");
        Permission::new(format!("{}.{}", self.permission_prefix, normalized))
    }

    fn authorize(&self, ctx: &AuthContext, tx: &Tx) -> Result<(), GateError> {
        let required = self.resolve_permission(tx);
        let granted = ctx
            .permissions()
            .iter()
            .any(|p| Permission::new(p.clone()).allows(&required));
        if !granted {
            return Err(GateError::Unauthorized("insufficient permissions".into()));
        }
        Ok(())
    }
}

impl Default for AuthZDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl Decorator for AuthZDecorator {
    fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<CheckResult, GateError> {
        self.authorize(ctx, tx)?;
        next.check(ctx, store, tx)
    }

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<DeliverResult, GateError> {
        self.authorize(ctx, tx)?;
        next.deliver(ctx, store, tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podgate_core::error::ErrorKind;
    use podgate_core::msg::{DeleteArtifactMsg, Metadata, Msg};
    use podgate_core::types::Address;
    use podgate_crypto::role_condition;
    use podgate_store::MemStore;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn seed_role(store: &mut MemStore, id: u64, permissions: &[&str], inherits: &[u64]) {
        let role = Role {
            metadata: Metadata::new(),
            id: RoleId(id),
            name: format!("role-{id}"),
            owner: addr(1),
            address: role_condition(RoleId(id)),
            role_ids: inherits.iter().map(|&i| RoleId(i)).collect(),
            permissions: permissions.iter().map(|p| Permission::new(*p)).collect(),
        };
        role_bucket()
            .put(store, Some(&RoleId(id).to_key()), &role)
            .unwrap();
    }

    fn delete_tx() -> Tx {
        Tx::new(Msg::DeleteArtifact(DeleteArtifactMsg {
            metadata: Metadata::new(),
            image: "foo/bar:v0.0.1".into(),
        }))
    }

    /// Terminal handler exposing the expanded context.
    struct Capture;

    impl Handler for Capture {
        fn check(
            &self,
            ctx: &AuthContext,
            _store: &mut dyn KvStore,
            _tx: &Tx,
        ) -> Result<CheckResult, GateError> {
            let mut log: Vec<String> = ctx.permissions().iter().cloned().collect();
            log.extend(ctx.conditions().iter().map(|c| c.to_hex()));
            Ok(CheckResult {
                log: log.join(","),
                ..Default::default()
            })
        }

        fn deliver(
            &self,
            _ctx: &AuthContext,
            _store: &mut dyn KvStore,
            _tx: &Tx,
        ) -> Result<DeliverResult, GateError> {
            Ok(DeliverResult::default())
        }
    }

    fn signer_ctx(a: Address) -> AuthContext {
        let mut ctx = AuthContext::new("test-chain");
        ctx.add_signer(a);
        ctx
    }

    #[test]
    fn bound_role_contributes_permissions_and_condition() {
        let mut store = MemStore::new();
        seed_role(&mut store, 1, &["_podgate.artifacts.*"], &[]);
        RoleBindingBucket::new()
            .create(&mut store, RoleId(1), addr(5))
            .unwrap();

        let res = AuthNDecorator::new()
            .check(&signer_ctx(addr(5)), &mut store, &delete_tx(), &Capture)
            .unwrap();
        assert!(res.log.contains("_podgate.artifacts.*"));
        assert!(res.log.contains(&role_condition(RoleId(1)).to_hex()));
        assert_eq!(res.gas_payment, ROLE_PARTICIPANT_GAS_COST);
    }

    #[test]
    fn inherited_roles_are_visited_once() {
        let mut store = MemStore::new();
        // devops inherits admin; both bound paths reach admin only once.
        seed_role(&mut store, 1, &["_podgate.artifacts.*"], &[]);
        seed_role(&mut store, 2, &["_podgate.deploy"], &[1]);
        RoleBindingBucket::new()
            .create(&mut store, RoleId(2), addr(5))
            .unwrap();
        RoleBindingBucket::new()
            .create(&mut store, RoleId(1), addr(5))
            .unwrap();

        let res = AuthNDecorator::new()
            .check(&signer_ctx(addr(5)), &mut store, &delete_tx(), &Capture)
            .unwrap();
        assert!(res.log.contains("_podgate.artifacts.*"));
        assert!(res.log.contains("_podgate.deploy"));
        // Two roles reached, two charges, regardless of how many edges
        // lead to them.
        assert_eq!(res.gas_payment, 2 * ROLE_PARTICIPANT_GAS_COST);
    }

    #[test]
    fn unbound_signer_passes_through_unchanged() {
        let mut store = MemStore::new();
        let res = AuthNDecorator::new()
            .check(&signer_ctx(addr(5)), &mut store, &delete_tx(), &Capture)
            .unwrap();
        assert_eq!(res.log, "");
        assert_eq!(res.gas_payment, 0);
    }

    #[test]
    fn missing_role_record_fails_resolution() {
        let mut store = MemStore::new();
        RoleBindingBucket::new()
            .create(&mut store, RoleId(9), addr(5))
            .unwrap();
        let err = AuthNDecorator::new()
            .check(&signer_ctx(addr(5)), &mut store, &delete_tx(), &Capture)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn authz_requires_matching_grant() {
        let mut store = MemStore::new();
        let mut ctx = signer_ctx(addr(5));
        let err = AuthZDecorator::new()
            .check(&ctx, &mut store, &delete_tx(), &Capture)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        ctx.add_permissions(["_podgate.artifacts.delete".to_string()]);
        AuthZDecorator::new()
            .check(&ctx, &mut store, &delete_tx(), &Capture)
            .unwrap();
    }

    #[test]
    fn authz_accepts_wildcard_grant() {
        let mut store = MemStore::new();
        let mut ctx = signer_ctx(addr(5));
        ctx.add_permissions(["_podgate.*".to_string()]);
        AuthZDecorator::new()
            .check(&ctx, &mut store, &delete_tx(), &Capture)
            .unwrap();
    }
}
