use std::collections::BTreeMap;

use podgate_core::error::GateError;
use podgate_core::kv::{KvRead, KvStore};

// ── MemStore ─────────────────────────────────────────────────────────────────

/// In-memory ordered store. The backing `BTreeMap` guarantees lexicographic
/// scan order.
#[derive(Default)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvRead for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GateError> {
        Ok(self.entries.get(key).cloned())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, GateError> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl KvStore for MemStore {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GateError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), GateError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ── CacheWrap ────────────────────────────────────────────────────────────────

/// A scratch store layered over a parent. Writes and deletions stay in the
/// overlay until [`CacheWrap::write`] flushes them; [`CacheWrap::discard`]
/// (or plain drop) throws them away. Wraps compose: a `CacheWrap` is itself
/// a `KvStore` and can be wrapped again.
///
/// Not thread-safe: each Check/Deliver owns its wrap for the duration of the
/// call.
pub struct CacheWrap<'a> {
    parent: &'a mut dyn KvStore,
    /// `None` marks a deletion shadowing the parent entry.
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheWrap<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            overlay: BTreeMap::new(),
        }
    }

    /// Flush all buffered mutations to the parent, in key order.
    pub fn write(self) -> Result<(), GateError> {
        for (key, value) in &self.overlay {
            match value {
                Some(v) => self.parent.put(key, v)?,
                None => self.parent.delete(key)?,
            }
        }
        Ok(())
    }

    /// Drop all buffered mutations.
    pub fn discard(self) {}
}

impl KvRead for CacheWrap<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GateError> {
        match self.overlay.get(key) {
            Some(v) => Ok(v.clone()),
            None => self.parent.get(key),
        }
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, GateError> {
        // Overlay entries shadow the parent's; a BTreeMap merge keeps the
        // result in lexicographic order.
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_scan(prefix)?.into_iter().collect();
        for (key, value) in self
            .overlay
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

impl KvStore for CacheWrap<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), GateError> {
        self.overlay.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), GateError> {
        self.overlay.insert(key.to_vec(), None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemStore {
        let mut store = MemStore::new();
        store.put(b"a:1", b"one").unwrap();
        store.put(b"a:2", b"two").unwrap();
        store.put(b"b:1", b"other").unwrap();
        store
    }

    #[test]
    fn prefix_scan_is_ordered() {
        let store = seeded();
        let hits = store.prefix_scan(b"a:").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, b"a:1".to_vec());
        assert_eq!(hits[1].0, b"a:2".to_vec());
    }

    #[test]
    fn discarded_wrap_leaves_parent_untouched() {
        let mut store = seeded();
        {
            let mut wrap = CacheWrap::new(&mut store);
            wrap.put(b"a:3", b"three").unwrap();
            wrap.delete(b"a:1").unwrap();
            wrap.discard();
        }
        assert_eq!(store.get(b"a:1").unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.get(b"a:3").unwrap(), None);
    }

    #[test]
    fn written_wrap_flushes_to_parent() {
        let mut store = seeded();
        {
            let mut wrap = CacheWrap::new(&mut store);
            wrap.put(b"a:3", b"three").unwrap();
            wrap.delete(b"a:1").unwrap();
            wrap.write().unwrap();
        }
        assert_eq!(store.get(b"a:1").unwrap(), None);
        assert_eq!(store.get(b"a:3").unwrap(), Some(b"three".to_vec()));
    }

    #[test]
    fn scan_reflects_overlay_and_shadows_deletions() {
        let mut store = seeded();
        let mut wrap = CacheWrap::new(&mut store);
        wrap.delete(b"a:1").unwrap();
        wrap.put(b"a:0", b"zero").unwrap();
        let hits = wrap.prefix_scan(b"a:").unwrap();
        let keys: Vec<_> = hits.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"a:0".to_vec(), b"a:2".to_vec()]);
    }

    #[test]
    fn wraps_compose() {
        let mut store = seeded();
        let mut outer = CacheWrap::new(&mut store);
        outer.put(b"a:3", b"three").unwrap();
        {
            let mut inner = CacheWrap::new(&mut outer);
            inner.put(b"a:4", b"four").unwrap();
            assert_eq!(inner.get(b"a:3").unwrap(), Some(b"three".to_vec()));
            inner.write().unwrap();
        }
        assert_eq!(outer.get(b"a:4").unwrap(), Some(b"four".to_vec()));
        outer.discard();
        assert_eq!(store.get(b"a:3").unwrap(), None);
        assert_eq!(store.get(b"a:4").unwrap(), None);
    }
}
