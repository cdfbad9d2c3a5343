use podgate_core::context::AuthContext;
use podgate_core::error::GateError;
use podgate_core::handler::{CheckResult, Decorator, DeliverResult, Handler};
use podgate_core::kv::KvStore;
use podgate_core::tx::{FeeInfo, Tx};

/// Fee accounting. Validates the declared fee and surfaces its amount as
/// gas payment on the Check result. Coin movement belongs to the cash
/// module, which is outside this system's scope.
pub struct FeeDecorator;

impl FeeDecorator {
    pub fn new() -> Self {
        Self
    }

    fn validate(&self, ctx: &AuthContext, fee: &FeeInfo) -> Result<(), GateError> {
        if fee.ticker.is_empty() {
            return Err(GateError::Invalid("fee ticker must not be empty".into()));
        }
        if let Some(payer) = fee.payer {
            if !ctx.has_address(&payer) {
                return Err(GateError::Unauthorized(
                    "fee payer's signature required".into(),
                ));
            }
        } else if ctx.main_signer().is_none() {
            return Err(GateError::Unauthorized(
                "fee without payer requires a main signer".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FeeDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl Decorator for FeeDecorator {
    fn check(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<CheckResult, GateError> {
        if let Some(fee) = &tx.fees {
            self.validate(ctx, fee)?;
        }
        let mut res = next.check(ctx, store, tx)?;
        if let Some(fee) = &tx.fees {
            res.gas_payment += fee.amount;
        }
        Ok(res)
    }

    fn deliver(
        &self,
        ctx: &AuthContext,
        store: &mut dyn KvStore,
        tx: &Tx,
        next: &dyn Handler,
    ) -> Result<DeliverResult, GateError> {
        if let Some(fee) = &tx.fees {
            self.validate(ctx, fee)?;
        }
        next.deliver(ctx, store, tx)
    }
}
