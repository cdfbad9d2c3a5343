pub mod genesis;

pub use genesis::{apply_genesis, load_genesis, GenesisFile};

use podgate_engine::query::QueryRouter;
use podgate_engine::{FeeDecorator, Router, SignatureDecorator, Stack, TxEngine};
use podgate_rbac::{AuthNDecorator, AuthZDecorator};

/// Compose the full execution pipeline: signature verification → RBAC
/// expansion → permission check → fee accounting → message dispatch.
pub fn build_engine(chain_id: impl Into<String>) -> TxEngine {
    let mut router = Router::new();
    podgate_artifact::register_routes(&mut router);

    let stack = Stack::new(
        vec![
            Box::new(SignatureDecorator::new()),
            Box::new(AuthNDecorator::new()),
            Box::new(AuthZDecorator::new()),
            Box::new(FeeDecorator::new()),
        ],
        router,
    );
    TxEngine::new(chain_id, stack)
}

/// Compose the read-side path table.
pub fn build_query_router() -> QueryRouter {
    let mut qr = QueryRouter::new();
    podgate_artifact::register_query(&mut qr);
    podgate_rbac::register_query(&mut qr);
    qr
}
