use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{error, info};

use podgate_core::context::AuthContext;
use podgate_core::error::GateError;
use podgate_core::handler::Event;
use podgate_core::kv::KvStore;
use podgate_core::tx::Tx;
use podgate_store::CacheWrap;

use crate::stack::Stack;

/// Result of a check_tx/deliver_tx call, encoded for the consensus layer.
/// `code == 0` means success; non-zero codes carry the stable error
/// taxonomy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxResult {
    pub code: u32,
    pub log: String,
    pub data: Vec<u8>,
    pub gas_allocated: u64,
    pub gas_payment: u64,
    pub events: Vec<Event>,
}

impl TxResult {
    fn from_err(err: &GateError) -> Self {
        Self {
            code: err.code(),
            log: err.to_string(),
            ..Default::default()
        }
    }
}

/// The deterministic transaction engine: decodes raw transactions and runs
/// them through the decorator stack over a cache-wrapped store.
///
/// Check always discards its wrap; Deliver writes it on success and
/// discards it on failure, so a failed Deliver leaves the parent store
/// bitwise unchanged. Panics inside handlers are caught here and mapped to
/// the `database` kind.
pub struct TxEngine {
    chain_id: String,
    stack: Stack,
}

impl TxEngine {
    pub fn new(chain_id: impl Into<String>, stack: Stack) -> Self {
        Self {
            chain_id: chain_id.into(),
            stack,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Validate a transaction against current state. The store is never
    /// mutated; only gas figures and pass/fail survive.
    pub fn check_tx(&self, store: &mut dyn KvStore, raw: &[u8]) -> TxResult {
        let tx = match Tx::decode(raw) {
            Ok(tx) => tx,
            Err(err) => return TxResult::from_err(&err),
        };

        let ctx = AuthContext::new(self.chain_id.clone());
        let mut wrap = CacheWrap::new(store);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.stack.check(&ctx, &mut wrap, &tx)
        }));
        wrap.discard();

        match outcome {
            Ok(Ok(res)) => TxResult {
                code: 0,
                log: res.log,
                gas_allocated: res.gas_allocated,
                gas_payment: res.gas_payment,
                ..Default::default()
            },
            Ok(Err(err)) => TxResult::from_err(&err),
            Err(panic) => self.panic_result("check", panic),
        }
    }

    /// Execute a transaction. On success the buffered writes are flushed to
    /// the parent store; on failure they are discarded.
    pub fn deliver_tx(&self, store: &mut dyn KvStore, raw: &[u8]) -> TxResult {
        let tx = match Tx::decode(raw) {
            Ok(tx) => tx,
            Err(err) => return TxResult::from_err(&err),
        };

        let ctx = AuthContext::new(self.chain_id.clone());
        let mut wrap = CacheWrap::new(store);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.stack.deliver(&ctx, &mut wrap, &tx)
        }));

        match outcome {
            Ok(Ok(res)) => {
                if let Err(err) = wrap.write() {
                    error!(error = %err, "failed to commit deliver batch");
                    return TxResult::from_err(&err);
                }
                info!(route = tx.msg.path(), "delivered transaction");
                TxResult {
                    code: 0,
                    log: res.log,
                    data: res.data,
                    events: res.events,
                    ..Default::default()
                }
            }
            Ok(Err(err)) => {
                wrap.discard();
                TxResult::from_err(&err)
            }
            Err(panic) => {
                wrap.discard();
                self.panic_result("deliver", panic)
            }
        }
    }

    fn panic_result(&self, phase: &str, panic: Box<dyn std::any::Any + Send>) -> TxResult {
        let msg = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(phase, panic = %msg, "handler panicked");
        TxResult::from_err(&GateError::Storage(format!("handler panic: {msg}")))
    }
}
