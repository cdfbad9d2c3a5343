use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use podgate_core::constants::{MAX_NAME_LENGTH, MAX_PERMISSION_LENGTH, MIN_PERMISSION_LENGTH};
use podgate_core::error::GateError;
use podgate_core::msg::Metadata;
use podgate_core::types::{Address, RoleId};
use podgate_store::Model;

// ── Permission ───────────────────────────────────────────────────────────────

static IS_PERMISSION_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-z._\-]+[0-9a-z]$").unwrap());

/// A dotted lowercase capability token, optionally ending in a `.*`
/// wildcard.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permission(pub String);

impl Permission {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.ends_with(".*")
    }

    pub fn validate(&self) -> Result<(), GateError> {
        let s = &self.0;
        if s.len() < MIN_PERMISSION_LENGTH {
            return Err(GateError::Invalid(format!(
                "permission must be at least {MIN_PERMISSION_LENGTH} chars"
            )));
        }
        if s.len() > MAX_PERMISSION_LENGTH {
            return Err(GateError::Invalid(format!(
                "permission must not exceed {MAX_PERMISSION_LENGTH} chars"
            )));
        }
        let body = s.strip_suffix(".*").unwrap_or(s);
        if !IS_PERMISSION_BODY.is_match(body) {
            return Err(GateError::Invalid(format!(
                "permission {s:?} contains invalid characters"
            )));
        }
        Ok(())
    }

    /// True iff this permission grants `other`. A wildcard grants every
    /// strict extension of its prefix but not the bare prefix itself, and a
    /// wildcard never appears on the right-hand side of the check.
    pub fn allows(&self, other: &Permission) -> bool {
        if other.is_wildcard() {
            return false;
        }
        if self == other {
            return true;
        }
        match self.0.strip_suffix('*') {
            // The kept suffix still ends with '.', so "x.*" covers "x.y"
            // but neither "x" nor "xy.z".
            Some(prefix) => other.0.starts_with(prefix) && other.0.len() > prefix.len(),
            None => false,
        }
    }
}

// ── Role ─────────────────────────────────────────────────────────────────────

/// A named bundle of permissions, optionally inheriting other roles. The
/// `address` is the deterministic role condition derived from `id`; it acts
/// as a synthetic signer while the role is active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub metadata: Metadata,
    pub id: RoleId,
    pub name: String,
    pub owner: Address,
    pub address: Address,
    /// Inherited roles, resolved transitively. Every entry must pre-exist
    /// when the role is stored, which keeps the graph acyclic.
    pub role_ids: Vec<RoleId>,
    pub permissions: Vec<Permission>,
}

impl Model for Role {
    fn validate(&self) -> Result<(), GateError> {
        self.metadata.validate()?;
        validate_name(&self.name)?;
        for p in &self.permissions {
            p.validate()?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), GateError> {
    match name.len() {
        0 => Err(GateError::Invalid("name must not be empty".into())),
        l if l > MAX_NAME_LENGTH => Err(GateError::Invalid(format!(
            "name must not exceed {MAX_NAME_LENGTH} chars"
        ))),
        _ => Ok(()),
    }
}

// ── Principal ────────────────────────────────────────────────────────────────

/// One accepted signing identity of a principal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedSignature {
    pub name: String,
    pub description: String,
    pub address: Address,
}

impl NamedSignature {
    pub fn validate(&self) -> Result<(), GateError> {
        validate_name(&self.name)
    }
}

/// An identity and its accepted signatures. The signature addresses feed a
/// unique index: one address binds to at most one principal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub metadata: Metadata,
    pub name: String,
    pub signatures: Vec<NamedSignature>,
}

impl Model for Principal {
    fn validate(&self) -> Result<(), GateError> {
        self.metadata.validate()?;
        validate_name(&self.name)?;
        if self.signatures.is_empty() {
            return Err(GateError::Invalid(
                "principal must carry at least one signature".into(),
            ));
        }
        for sig in &self.signatures {
            sig.validate()?;
        }
        Ok(())
    }
}

// ── RoleBinding ──────────────────────────────────────────────────────────────

/// Edge from a signature address to a role. Stored under the 28-byte
/// concatenation `signature || role_id`, so a prefix scan by address yields
/// all granted roles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub metadata: Metadata,
    pub role_id: RoleId,
    pub signature: Address,
}
