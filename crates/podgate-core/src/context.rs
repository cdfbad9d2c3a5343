use std::collections::BTreeSet;

use crate::types::Address;

/// Authentication state threaded through the decorator chain.
///
/// `signers` holds the transaction signer addresses in signature order (the
/// first entry is the main signer). `conditions` holds synthetic addresses
/// added during RBAC expansion, kept sorted so that replicas observe
/// identical context digests. `permissions` is the union of all permissions
/// granted by reached roles; a `BTreeSet` so iteration order is fixed.
#[derive(Clone, Debug, Default)]
pub struct AuthContext {
    pub chain_id: String,
    signers: Vec<Address>,
    conditions: Vec<Address>,
    permissions: BTreeSet<String>,
}

impl AuthContext {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            ..Default::default()
        }
    }

    /// Record a verified transaction signer. Order of calls is preserved.
    pub fn add_signer(&mut self, addr: Address) {
        if !self.signers.contains(&addr) {
            self.signers.push(addr);
        }
    }

    /// Merge role conditions into the context, keeping the list sorted and
    /// free of duplicates.
    pub fn add_conditions(&mut self, addrs: impl IntoIterator<Item = Address>) {
        self.conditions.extend(addrs);
        self.conditions.sort();
        self.conditions.dedup();
    }

    pub fn add_permissions(&mut self, perms: impl IntoIterator<Item = String>) {
        self.permissions.extend(perms);
    }

    /// The first transaction signer, used when a message leaves `owner`
    /// unset.
    pub fn main_signer(&self) -> Option<Address> {
        self.signers.first().copied()
    }

    /// True iff `addr` is a verified signer or an active role condition.
    pub fn has_address(&self, addr: &Address) -> bool {
        self.signers.contains(addr) || self.conditions.binary_search(addr).is_ok()
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn conditions(&self) -> &[Address] {
        &self.conditions
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }
}
