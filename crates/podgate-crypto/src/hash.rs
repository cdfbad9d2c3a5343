use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use podgate_core::error::GateError;
use podgate_core::types::{Address, PubKey, RoleId, SignatureBytes, ADDRESS_LENGTH};

/// Compute SHA-256 of arbitrary bytes → 32-byte array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn truncate_address(digest: [u8; 32]) -> Address {
    let mut arr = [0u8; ADDRESS_LENGTH];
    arr.copy_from_slice(&digest[..ADDRESS_LENGTH]);
    Address::from_bytes(arr)
}

/// Derive an [`Address`] from raw Ed25519 public key bytes.
pub fn address_from_pubkey(pubkey_bytes: &[u8]) -> Address {
    truncate_address(sha256(pubkey_bytes))
}

/// Derive a synthetic condition address from an extension/type/data triple.
/// The separator keeps `("ab","c")` and `("a","bc")` preimages distinct.
pub fn condition_address(ext: &str, typ: &str, data: &[u8]) -> Address {
    let mut preimage = Vec::with_capacity(ext.len() + typ.len() + data.len() + 2);
    preimage.extend_from_slice(ext.as_bytes());
    preimage.push(b'/');
    preimage.extend_from_slice(typ.as_bytes());
    preimage.push(b'/');
    preimage.extend_from_slice(data);
    truncate_address(sha256(&preimage))
}

/// The address representing "the holder of role `id` is active".
pub fn role_condition(id: RoleId) -> Address {
    condition_address("rbac", "role", &id.to_key())
}

/// The digest covered by a transaction signature:
/// `SHA256(chain_id || nonce_be_u64 || msg_bytes)`.
pub fn signing_digest(chain_id: &str, nonce: u64, msg_bytes: &[u8]) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(chain_id.len() + 8 + msg_bytes.len());
    preimage.extend_from_slice(chain_id.as_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    preimage.extend_from_slice(msg_bytes);
    sha256(&preimage)
}

/// Verify an Ed25519 signature over `digest`.
pub fn verify_signature(
    pubkey: &PubKey,
    digest: &[u8],
    signature: &SignatureBytes,
) -> Result<(), GateError> {
    let pk_bytes: [u8; 32] = pubkey
        .0
        .as_slice()
        .try_into()
        .map_err(|_| GateError::InvalidSignature)?;
    let vk = VerifyingKey::from_bytes(&pk_bytes).map_err(|_| GateError::InvalidSignature)?;
    let sig = Signature::from_slice(&signature.0).map_err(|_| GateError::InvalidSignature)?;
    vk.verify(digest, &sig).map_err(|_| GateError::InvalidSignature)
}
