use std::collections::BTreeMap;

use podgate_core::context::AuthContext;
use podgate_core::error::GateError;
use podgate_core::handler::{CheckResult, DeliverResult, Handler};
use podgate_core::kv::KvStore;
use podgate_core::tx::Tx;

/// Static dispatch table from message route to handler. Sits at the bottom
/// of the decorator stack.
#[derive(Default)]
pub struct Router {
    routes: BTreeMap<&'static str, Box<dyn Handler + Send + Sync>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, path: &'static str, handler: Box<dyn Handler + Send + Sync>) {
        self.routes.insert(path, handler);
    }

    fn route(&self, tx: &Tx) -> Result<&(dyn Handler + Send + Sync), GateError> {
        let path = tx.msg.path();
        self.routes
            .get(path)
            .map(|h| h.as_ref())
            .ok_or_else(|| GateError::UnknownRoute(path.to_string()))
    }
}

impl Handler for Router {
    fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<CheckResult, GateError> {
        self.route(tx)?.check(ctx, store, tx)
    }

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<DeliverResult, GateError> {
        self.route(tx)?.deliver(ctx, store, tx)
    }
}
