pub mod engine;
pub mod fee;
pub mod query;
pub mod router;
pub mod sigs;
pub mod stack;

pub use engine::{TxEngine, TxResult};
pub use fee::FeeDecorator;
pub use query::{IdEncoder, QueryResult, QueryRouter};
pub use router::Router;
pub use sigs::SignatureDecorator;
pub use stack::Stack;
