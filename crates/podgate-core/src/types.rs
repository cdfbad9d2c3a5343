use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GateError;

/// Per-signer transaction counter (monotonically increasing).
pub type Nonce = u64;

/// Length of an [`Address`] in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ── Address ──────────────────────────────────────────────────────────────────

/// 20-byte identifier derived from an Ed25519 public key or a deterministic
/// condition preimage (see `podgate-crypto`). Displayed as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    pub fn from_bytes(b: [u8; ADDRESS_LENGTH]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, GateError> {
        let bytes = hex::decode(s)
            .map_err(|e| GateError::Invalid(format!("address not hex: {e}")))?;
        Self::try_from(bytes.as_slice())
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = GateError;

    fn try_from(b: &[u8]) -> Result<Self, GateError> {
        if b.len() != ADDRESS_LENGTH {
            return Err(GateError::Invalid(format!(
                "address must be {ADDRESS_LENGTH} bytes, got {}",
                b.len()
            )));
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(b);
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..8])
    }
}

// ── RoleId ───────────────────────────────────────────────────────────────────

/// Role identifier, assigned by the role bucket's sequence. Stored under its
/// 8-byte big-endian encoding so that lexicographic key order equals numeric
/// order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(pub u64);

impl RoleId {
    pub fn to_key(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_key(b: &[u8]) -> Result<Self, GateError> {
        if b.len() != 8 {
            return Err(GateError::Invalid(format!(
                "role id key must be 8 bytes, got {}",
                b.len()
            )));
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(Self(u64::from_be_bytes(arr)))
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoleId({})", self.0)
    }
}

// ── Ed25519 wire newtypes ────────────────────────────────────────────────────

/// Ed25519 public key bytes (32 bytes). Kept as a plain byte vector on the
/// wire; `podgate-crypto` parses it into a verifying key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey(pub Vec<u8>);

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({}b)", self.0.len())
    }
}

/// Ed25519 signature bytes (64 bytes).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBytes(pub Vec<u8>);

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({}b)", self.0.len())
    }
}
