use podgate_core::context::AuthContext;
use podgate_core::error::GateError;
use podgate_core::handler::{CheckResult, Decorator, DeliverResult, Handler};
use podgate_core::kv::KvStore;
use podgate_core::tx::Tx;

use crate::router::Router;

/// The full execution pipeline: an ordered decorator chain composed
/// outside-in around the message router. Call order for
/// `[a, b]` is `a → b → router`.
pub struct Stack {
    decorators: Vec<Box<dyn Decorator + Send + Sync>>,
    router: Router,
}

impl Stack {
    pub fn new(decorators: Vec<Box<dyn Decorator + Send + Sync>>, router: Router) -> Self {
        Self { decorators, router }
    }

    pub fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<CheckResult, GateError> {
        Next {
            decorators: &self.decorators,
            handler: &self.router,
        }
        .check(ctx, store, tx)
    }

    pub fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<DeliverResult, GateError> {
        Next {
            decorators: &self.decorators,
            handler: &self.router,
        }
        .deliver(ctx, store, tx)
    }
}

/// The remainder of the chain from one decorator's point of view. Peeling
/// the first decorator off the slice yields the `next` passed to it.
struct Next<'a> {
    decorators: &'a [Box<dyn Decorator + Send + Sync>],
    handler: &'a dyn Handler,
}

impl Handler for Next<'_> {
    fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<CheckResult, GateError> {
        match self.decorators.split_first() {
            Some((first, rest)) => first.check(
                ctx,
                store,
                tx,
                &Next {
                    decorators: rest,
                    handler: self.handler,
                },
            ),
            None => self.handler.check(ctx, store, tx),
        }
    }

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
    ) -> Result<DeliverResult, GateError> {
        match self.decorators.split_first() {
            Some((first, rest)) => first.deliver(
                ctx,
                store,
                tx,
                &Next {
                    decorators: rest,
                    handler: self.handler,
                },
            ),
            None => self.handler.deliver(ctx, store, tx),
        }
    }
}
