use crate::context::AuthContext;
use crate::error::GateError;
use crate::kv::KvStore;
use crate::tx::Tx;

// ── Results ──────────────────────────────────────────────────────────────────

/// Outcome of the Check phase. The store used during Check is always a
/// throwaway cache-wrap; only these numbers survive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckResult {
    pub gas_allocated: u64,
    pub gas_payment: u64,
    pub log: String,
}

impl CheckResult {
    pub fn with_gas(gas_allocated: u64) -> Self {
        Self {
            gas_allocated,
            ..Default::default()
        }
    }
}

/// A structured event emitted during Deliver, surfaced to the consensus
/// layer alongside the result data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

/// Outcome of the Deliver phase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliverResult {
    pub data: Vec<u8>,
    pub log: String,
    pub events: Vec<Event>,
}

impl DeliverResult {
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }
}

// ── Handler / Decorator ──────────────────────────────────────────────────────

/// A message handler. `check` validates and prices; `deliver` validates and
/// mutates. Both receive a cache-wrapped store owned by the engine for the
/// duration of the call.
pub trait Handler {
    fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<CheckResult, GateError>;

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<DeliverResult, GateError>;
}

/// A middleware layer around a [`Handler`]. Decorators forward upstream
/// errors verbatim; they may derive a new context and pass it to `next`.
pub trait Decorator {
    fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<CheckResult, GateError>;

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<DeliverResult, GateError>;
}
