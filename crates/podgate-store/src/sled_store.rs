use std::path::Path;

use podgate_core::error::GateError;
use podgate_core::kv::{KvRead, KvStore};

/// Committed state backed by sled (pure-Rust, no C dependencies).
///
/// A single tree holds the whole keyspace; bucket and index prefixes keep it
/// partitioned (see `bucket.rs`). The deliver path mutates this store only
/// through a flushed [`crate::CacheWrap`], so concurrent readers observe
/// committed entries exclusively.
/// Cloning yields another handle onto the same tree (sled is internally
/// reference-counted); the node gives the single-writer loop one handle and
/// the read-side another.
#[derive(Clone)]
pub struct SledStore {
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Open or create the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GateError> {
        let db = sled::open(path).map_err(|e| GateError::Storage(e.to_string()))?;
        let tree = db
            .open_tree("state")
            .map_err(|e| GateError::Storage(e.to_string()))?;
        Ok(Self { _db: db, tree })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), GateError> {
        self._db
            .flush()
            .map_err(|e| GateError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl KvRead for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GateError> {
        self.tree
            .get(key)
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(|e| GateError::Storage(e.to_string()))
    }

    fn has(&self, key: &[u8]) -> Result<bool, GateError> {
        self.tree
            .contains_key(key)
            .map_err(|e| GateError::Storage(e.to_string()))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, GateError> {
        let mut out = Vec::new();
        for item in self.tree.scan_prefix(prefix) {
            let (k, v) = item.map_err(|e| GateError::Storage(e.to_string()))?;
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }
}

impl KvStore for SledStore {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GateError> {
        self.tree
            .insert(key, value)
            .map_err(|e| GateError::Storage(e.to_string()))?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), GateError> {
        self.tree
            .remove(key)
            .map_err(|e| GateError::Storage(e.to_string()))?;
        Ok(())
    }
}
