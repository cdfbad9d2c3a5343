pub mod bucket;
pub mod kv;
pub mod sled_store;

pub use bucket::{Model, ModelBucket, Sequence};
pub use kv::{CacheWrap, MemStore};
pub use sled_store::SledStore;
