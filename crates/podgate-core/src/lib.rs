pub mod constants;
pub mod context;
pub mod error;
pub mod handler;
pub mod kv;
pub mod msg;
pub mod tx;
pub mod types;

pub use constants::*;
pub use context::AuthContext;
pub use error::{ErrorKind, GateError};
pub use handler::{CheckResult, Decorator, DeliverResult, Event, Handler};
pub use kv::{KvRead, KvStore};
pub use msg::{CreateArtifactMsg, DeleteArtifactMsg, Metadata, Msg};
pub use tx::{FeeInfo, StdSignature, Tx};
pub use types::*;
