use serde::{Deserialize, Serialize};

use podgate_core::context::AuthContext;
use podgate_core::error::GateError;
use podgate_core::handler::{CheckResult, Decorator, DeliverResult, Handler};
use podgate_core::kv::KvStore;
use podgate_core::msg::Metadata;
use podgate_core::tx::Tx;
use podgate_core::types::PubKey;
use podgate_crypto::{address_from_pubkey, signing_digest, verify_signature};
use podgate_store::{Model, ModelBucket};

const BUCKET_NAME: &str = "sigs";

// ── Signer records ───────────────────────────────────────────────────────────

/// Per-signer replay-protection state, keyed by address. `sequence` is the
/// nonce the next transaction must carry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignerRecord {
    pub metadata: Metadata,
    pub pubkey: PubKey,
    pub sequence: u64,
}

impl Model for SignerRecord {
    fn validate(&self) -> Result<(), GateError> {
        self.metadata.validate()?;
        if self.pubkey.0.len() != 32 {
            return Err(GateError::Invalid(format!(
                "pubkey must be 32 bytes, got {}",
                self.pubkey.0.len()
            )));
        }
        Ok(())
    }
}

fn sigs_bucket() -> ModelBucket<SignerRecord> {
    ModelBucket::new(BUCKET_NAME)
}

// ── SignatureDecorator ───────────────────────────────────────────────────────

/// Outermost decorator: verifies every transaction signature against
/// `SHA256(chain_id || nonce || msg_bytes)`, enforces the strictly
/// increasing per-signer nonce, and seeds the auth context with the signer
/// addresses in signature order (first = main signer). A transaction
/// without signatures is rejected before anything else runs.
///
/// The nonce advances in Check as well; Check runs on a throwaway
/// cache-wrap, so only Deliver's advance survives.
pub struct SignatureDecorator {
    bucket: ModelBucket<SignerRecord>,
}

impl SignatureDecorator {
    pub fn new() -> Self {
        Self {
            bucket: sigs_bucket(),
        }
    }

    fn authenticate(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<AuthContext, GateError> {
        if tx.signatures.is_empty() {
            return Err(GateError::NoSignatures);
        }
        let msg_bytes = tx.msg.encode()?;
        let mut ctx = ctx.clone();

        for sig in &tx.signatures {
            let addr = address_from_pubkey(&sig.pubkey.0);
            let mut record = match self.bucket.one(&*store, addr.as_bytes()) {
                Ok(record) => {
                    if record.pubkey != sig.pubkey {
                        return Err(GateError::InvalidSignature);
                    }
                    record
                }
                Err(GateError::NotFound(_)) => SignerRecord {
                    metadata: Metadata::new(),
                    pubkey: sig.pubkey.clone(),
                    sequence: 0,
                },
                Err(other) => return Err(other),
            };

            if sig.nonce != record.sequence {
                return Err(GateError::InvalidNonce {
                    expected: record.sequence,
                    got: sig.nonce,
                });
            }

            let digest = signing_digest(&ctx.chain_id, sig.nonce, &msg_bytes);
            verify_signature(&sig.pubkey, &digest, &sig.signature)?;

            record.sequence += 1;
            self.bucket.put(store, Some(addr.as_bytes()), &record)?;
            ctx.add_signer(addr);
        }
        Ok(ctx)
    }
}

impl Default for SignatureDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl Decorator for SignatureDecorator {
    fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<CheckResult, GateError> {
        let ctx = self.authenticate(ctx, store, tx)?;
        next.check(&ctx, store, tx)
    }

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<DeliverResult, GateError> {
        let ctx = self.authenticate(ctx, store, tx)?;
        next.deliver(&ctx, store, tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podgate_core::error::ErrorKind;
    use podgate_core::msg::{DeleteArtifactMsg, Msg};
    use podgate_crypto::KeyPair;
    use podgate_store::MemStore;

    struct CaptureSigners;

    impl Handler for CaptureSigners {
        fn check(
            &self,
            ctx: &AuthContext,
            _store: &mut dyn KvStore,
            _tx: &Tx,
        ) -> Result<CheckResult, GateError> {
            Ok(CheckResult {
                log: ctx
                    .signers()
                    .iter()
                    .map(|a| a.to_hex())
                    .collect::<Vec<_>>()
                    .join(","),
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

    fn signed_tx(kp: &KeyPair, nonce: u64) -> Tx {
        let msg = Msg::DeleteArtifact(DeleteArtifactMsg {
            metadata: Metadata::new(),
            image: "x/y:1".into(),
        });
        let mut tx = Tx::new(msg);
        tx.signatures
            .push(kp.sign_msg("test-chain", nonce, &tx.msg.encode().unwrap()));
        tx
    }

    #[test]
    fn valid_signature_adds_signer_to_context() {
        let kp = KeyPair::from_seed([1u8; 32]);
        let mut store = MemStore::new();
        let d = SignatureDecorator::new();
        let res = d
            .check(
                &AuthContext::new("test-chain"),
                &mut store,
                &signed_tx(&kp, 0),
                &CaptureSigners,
            )
            .unwrap();
        assert_eq!(res.log, kp.address.to_hex());
    }

    #[test]
    fn unsigned_transaction_is_rejected() {
        let mut store = MemStore::new();
        let tx = Tx::new(Msg::DeleteArtifact(DeleteArtifactMsg {
            metadata: Metadata::new(),
            image: "x/y:1".into(),
        }));
        let d = SignatureDecorator::new();
        let err = d
            .check(&AuthContext::new("test-chain"), &mut store, &tx, &CaptureSigners)
            .unwrap_err();
        assert!(matches!(err, GateError::NoSignatures));
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn nonce_must_match_counter() {
        let kp = KeyPair::from_seed([1u8; 32]);
        let mut store = MemStore::new();
        let d = SignatureDecorator::new();

        // First use must carry nonce 0.
        let err = d
            .deliver(
                &AuthContext::new("test-chain"),
                &mut store,
                &signed_tx(&kp, 1),
                &CaptureSigners,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);

        d.deliver(
            &AuthContext::new("test-chain"),
            &mut store,
            &signed_tx(&kp, 0),
            &CaptureSigners,
        )
        .unwrap();

        // Replaying the same nonce fails.
        let err = d
            .deliver(
                &AuthContext::new("test-chain"),
                &mut store,
                &signed_tx(&kp, 0),
                &CaptureSigners,
            )
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidNonce { expected: 1, got: 0 }));

        d.deliver(
            &AuthContext::new("test-chain"),
            &mut store,
            &signed_tx(&kp, 1),
            &CaptureSigners,
        )
        .unwrap();
    }

    #[test]
    fn wrong_chain_id_fails_verification() {
        let kp = KeyPair::from_seed([1u8; 32]);
        let mut store = MemStore::new();
        let d = SignatureDecorator::new();
        let err = d
            .check(
                &AuthContext::new("other-chain"),
                &mut store,
                &signed_tx(&kp, 0),
                &CaptureSigners,
            )
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidSignature));
    }

    #[test]
    fn tampered_message_fails_verification() {
        let kp = KeyPair::from_seed([1u8; 32]);
        let mut store = MemStore::new();
        let mut tx = signed_tx(&kp, 0);
        tx.msg = Msg::DeleteArtifact(DeleteArtifactMsg {
            metadata: Metadata::new(),
            image: "tampered/image:1".into(),
        });
        let d = SignatureDecorator::new();
        let err = d
            .check(
                &AuthContext::new("test-chain"),
                &mut store,
                &tx,
                &CaptureSigners,
            )
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidSignature));
    }
}
