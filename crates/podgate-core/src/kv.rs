use crate::error::GateError;

/// Read-only view of an ordered byte-keyed store.
///
/// `prefix_scan` must return entries in lexicographic key order; a cache
/// overlay must merge its own entries with the parent's, with deletions
/// shadowing parent entries. Implementations never iterate unordered
/// containers; replica determinism depends on it.
pub trait KvRead {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GateError>;

    fn has(&self, key: &[u8]) -> Result<bool, GateError> {
        Ok(self.get(key)?.is_some())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, GateError>;
}

/// Mutable ordered byte-keyed store. Cache wrapping (buffered child stores
/// with explicit write/discard) is provided by `podgate-store`.
pub trait KvStore: KvRead {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GateError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), GateError>;
}

impl<T: KvRead + ?Sized> KvRead for &T {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GateError> {
        (**self).get(key)
    }

    fn has(&self, key: &[u8]) -> Result<bool, GateError> {
        (**self).has(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, GateError> {
        (**self).prefix_scan(prefix)
    }
}

impl<T: KvRead + ?Sized> KvRead for std::sync::Arc<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GateError> {
        (**self).get(key)
    }

    fn has(&self, key: &[u8]) -> Result<bool, GateError> {
        (**self).has(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, GateError> {
        (**self).prefix_scan(prefix)
    }
}
