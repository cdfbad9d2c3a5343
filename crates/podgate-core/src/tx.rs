use serde::{Deserialize, Serialize};

use crate::error::GateError;
use crate::msg::Msg;
use crate::types::{Address, Nonce, PubKey, SignatureBytes};

// ── Signatures ───────────────────────────────────────────────────────────────

/// A single signer's proof. The signed digest is
/// `SHA256(chain_id || nonce_be_u64 || bincode(msg))`; see
/// `podgate_crypto::signing_digest`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pubkey: PubKey,
    /// Must equal the signer's persisted counter; increments on success.
    pub nonce: Nonce,
    pub signature: SignatureBytes,
}

// ── Fees ─────────────────────────────────────────────────────────────────────

/// Optional fee declaration. The payer defaults to the main signer. Coin
/// movement belongs to the out-of-scope cash module; the engine only
/// accounts the amount as gas payment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeInfo {
    pub payer: Option<Address>,
    pub amount: u64,
    pub ticker: String,
}

// ── Transaction ──────────────────────────────────────────────────────────────

/// The envelope consumed by the transaction engine: exactly one message,
/// an ordered signature list (first signature = main signer), optional fees
/// and multisig contract references.
///
/// The wire format is the bincode encoding of this struct; all variable
/// length fields are length-prefixed by bincode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    pub msg: Msg,
    pub signatures: Vec<StdSignature>,
    pub fees: Option<FeeInfo>,
    pub multisig_ids: Vec<u64>,
}

impl Tx {
    pub fn new(msg: Msg) -> Self {
        Self {
            msg,
            signatures: Vec::new(),
            fees: None,
            multisig_ids: Vec::new(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, GateError> {
        bincode::serialize(self).map_err(|e| GateError::Serialization(e.to_string()))
    }

    pub fn decode(raw: &[u8]) -> Result<Self, GateError> {
        bincode::deserialize(raw)
            .map_err(|e| GateError::Invalid(format!("cannot decode transaction: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::{CreateArtifactMsg, Metadata};

    fn sample_tx() -> Tx {
        let mut tx = Tx::new(Msg::CreateArtifact(CreateArtifactMsg {
            metadata: Metadata::new(),
            image: "foo/bar:v0.0.1".into(),
            checksum: "myChecksum123456".into(),
            owner: None,
        }));
        tx.signatures.push(StdSignature {
            pubkey: PubKey(vec![7u8; 32]),
            nonce: 0,
            signature: SignatureBytes(vec![9u8; 64]),
        });
        tx
    }

    #[test]
    fn tx_encode_decode_is_identity() {
        let tx = sample_tx();
        let raw = tx.encode().unwrap();
        assert_eq!(Tx::decode(&raw).unwrap(), tx);
    }

    #[test]
    fn garbage_bytes_fail_decode() {
        let err = Tx::decode(b"not a transaction").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Invalid);
    }
}
