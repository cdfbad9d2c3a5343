pub mod hash;
pub mod keypair;

pub use hash::{
    address_from_pubkey, condition_address, role_condition, sha256, signing_digest,
    verify_signature,
};
pub use keypair::KeyPair;
