use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use podgate_core::tx::StdSignature;
use podgate_core::types::{Address, PubKey, SignatureBytes};

use crate::hash::{address_from_pubkey, signing_digest};

/// A podgate keypair: an Ed25519 signing key with its derived [`Address`].
///
/// The signing key wipes its memory on drop (dalek's zeroize support); seeds
/// passing through [`KeyPair::from_seed`] are wrapped in `Zeroizing` so the
/// intermediate copy is wiped too.
pub struct KeyPair {
    pub address: Address,
    signing: SigningKey,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS RNG. Never called inside
    /// Check/Deliver; key generation is a client/tooling concern.
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing)
    }

    /// Deterministic keypair from a 32-byte seed (tests, genesis tooling).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let seed = Zeroizing::new(seed);
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    fn from_signing_key(signing: SigningKey) -> Self {
        let address = address_from_pubkey(signing.verifying_key().as_bytes());
        Self { address, signing }
    }

    pub fn pubkey(&self) -> PubKey {
        PubKey(self.signing.verifying_key().to_bytes().to_vec())
    }

    /// Sign a prepared digest.
    pub fn sign(&self, digest: &[u8]) -> SignatureBytes {
        SignatureBytes(self.signing.sign(digest).to_bytes().to_vec())
    }

    /// Build a complete [`StdSignature`] over a message encoding.
    pub fn sign_msg(&self, chain_id: &str, nonce: u64, msg_bytes: &[u8]) -> StdSignature {
        let digest = signing_digest(chain_id, nonce, msg_bytes);
        StdSignature {
            pubkey: self.pubkey(),
            nonce,
            signature: self.sign(&digest),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ address: {:?} }}", self.address)
    }
}
