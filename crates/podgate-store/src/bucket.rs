use serde::de::DeserializeOwned;
use serde::Serialize;

use podgate_core::error::GateError;
use podgate_core::kv::{KvRead, KvStore};

// ── Key layout ───────────────────────────────────────────────────────────────
//
//   <bucket>:<key>                      → bincode(entity)
//   _i.<bucket>_<index>:<ik>            → primary key          (unique index)
//   _i.<bucket>_<index>:<ik>:<key>      → primary key          (multi index)
//   _s.<bucket>.id                      → 8-byte BE counter

/// Primary key under the bucket prefix.
pub fn db_key(bucket: &str, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bucket.len() + 1 + key.len());
    out.extend_from_slice(bucket.as_bytes());
    out.push(b':');
    out.extend_from_slice(key);
    out
}

/// Scan prefix covering a whole bucket.
pub fn bucket_prefix(bucket: &str) -> Vec<u8> {
    db_key(bucket, b"")
}

/// Entry key of a unique index.
pub fn index_key(bucket: &str, index: &str, ik: &[u8]) -> Vec<u8> {
    let mut out = format!("_i.{bucket}_{index}:").into_bytes();
    out.extend_from_slice(ik);
    out
}

/// Scan prefix of a multi-key index for one index value.
pub fn index_scan_prefix(bucket: &str, index: &str, ik: &[u8]) -> Vec<u8> {
    let mut out = index_key(bucket, index, ik);
    out.push(b':');
    out
}

fn index_entry_key(bucket: &str, index: &str, ik: &[u8], primary: &[u8]) -> Vec<u8> {
    let mut out = index_scan_prefix(bucket, index, ik);
    out.extend_from_slice(primary);
    out
}

// ── Sequence ─────────────────────────────────────────────────────────────────

/// Monotonic 8-byte big-endian counter persisted at `_s.<bucket>.id`.
/// The first allocated value is 1.
pub struct Sequence {
    key: Vec<u8>,
}

impl Sequence {
    pub fn new(bucket: &str) -> Self {
        Self {
            key: format!("_s.{bucket}.id").into_bytes(),
        }
    }

    pub fn next_val(&self, store: &mut dyn KvStore) -> Result<u64, GateError> {
        let current = match store.get(&self.key)? {
            Some(raw) => {
                let arr: [u8; 8] = raw.as_slice().try_into().map_err(|_| {
                    GateError::Human(format!(
                        "sequence {} holds {} bytes, want 8",
                        String::from_utf8_lossy(&self.key),
                        raw.len()
                    ))
                })?;
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        let next = current + 1;
        store.put(&self.key, &next.to_be_bytes())?;
        Ok(next)
    }
}

// ── ModelBucket ──────────────────────────────────────────────────────────────

/// An entity persisted by a [`ModelBucket`]. Validation runs on every put.
pub trait Model: Serialize + DeserializeOwned {
    fn validate(&self) -> Result<(), GateError>;
}

type Indexer<M> = fn(&M) -> Vec<Vec<u8>>;

struct Index<M> {
    name: &'static str,
    unique: bool,
    indexer: Indexer<M>,
}

/// A typed collection over the raw store: name prefix, entity schema, an
/// optional ID sequence, and secondary indexes whose upkeep is transactional
/// with primary writes (the caller's cache-wrap makes the pair atomic).
///
/// The runtime type check of a dynamically-typed bucket becomes the `M`
/// parameter here: storing the wrong entity type is a compile error.
pub struct ModelBucket<M: Model> {
    name: &'static str,
    sequence: Option<Sequence>,
    indexes: Vec<Index<M>>,
}

impl<M: Model> ModelBucket<M> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            sequence: None,
            indexes: Vec::new(),
        }
    }

    /// Draw primary keys from the bucket's sequence when `put` gets no key.
    pub fn with_sequence(mut self) -> Self {
        self.sequence = Some(Sequence::new(self.name));
        self
    }

    pub fn with_index(mut self, name: &'static str, indexer: Indexer<M>, unique: bool) -> Self {
        self.indexes.push(Index {
            name,
            unique,
            indexer,
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Allocate the next sequence value. Used by genesis loaders that need
    /// the id before constructing the entity.
    pub fn next_seq(&self, store: &mut dyn KvStore) -> Result<u64, GateError> {
        match &self.sequence {
            Some(seq) => seq.next_val(store),
            None => Err(GateError::Human(format!(
                "bucket {} has no id sequence",
                self.name
            ))),
        }
    }

    /// Validate and store `entity`. With `key == None` the primary key is
    /// drawn from the bucket's sequence (8-byte big-endian). Returns the key
    /// the entity was stored under.
    pub fn put(
        &self,
        store: &mut dyn KvStore,
        key: Option<&[u8]>,
        entity: &M,
    ) -> Result<Vec<u8>, GateError> {
        entity
            .validate()
            .map_err(|e| GateError::Invalid(format!("invalid {} model: {e}", self.name)))?;

        let key = match key {
            Some(k) => k.to_vec(),
            None => self.next_seq(store)?.to_be_bytes().to_vec(),
        };

        // Unique collisions are detected before anything is written.
        for idx in self.indexes.iter().filter(|i| i.unique) {
            for ik in (idx.indexer)(entity) {
                if let Some(existing) = store.get(&index_key(self.name, idx.name, &ik))? {
                    if existing != key {
                        return Err(GateError::Duplicate(format!(
                            "index {}/{} already binds {}",
                            self.name,
                            idx.name,
                            hex::encode(&ik)
                        )));
                    }
                }
            }
        }

        // Index entries computed from the previous value are removed before
        // the new ones are inserted.
        let old = self.load(&*store, &key)?;
        if let Some(old_entity) = &old {
            self.remove_index_entries(store, &key, old_entity)?;
        }

        let raw =
            bincode::serialize(entity).map_err(|e| GateError::Serialization(e.to_string()))?;
        store.put(&db_key(self.name, &key), &raw)?;
        self.insert_index_entries(store, &key, entity)?;
        Ok(key)
    }

    /// Read exactly one entity.
    pub fn one(&self, store: &dyn KvRead, key: &[u8]) -> Result<M, GateError> {
        self.load(store, key)?
            .ok_or_else(|| GateError::NotFound(format!("{} not in the store", self.name)))
    }

    pub fn has(&self, store: &dyn KvRead, key: &[u8]) -> Result<bool, GateError> {
        store.has(&db_key(self.name, key))
    }

    /// Look up entities through a secondary index. Returns `(key, entity)`
    /// pairs; empty when nothing matches.
    pub fn by_index(
        &self,
        store: &dyn KvRead,
        index: &str,
        ik: &[u8],
    ) -> Result<Vec<(Vec<u8>, M)>, GateError> {
        let idx = self
            .indexes
            .iter()
            .find(|i| i.name == index)
            .ok_or_else(|| {
                GateError::Human(format!("bucket {} has no index {index}", self.name))
            })?;

        let primary_keys: Vec<Vec<u8>> = if idx.unique {
            match store.get(&index_key(self.name, index, ik))? {
                Some(primary) => vec![primary],
                None => Vec::new(),
            }
        } else {
            store
                .prefix_scan(&index_scan_prefix(self.name, index, ik))?
                .into_iter()
                .map(|(_, primary)| primary)
                .collect()
        };

        let mut out = Vec::with_capacity(primary_keys.len());
        for key in primary_keys {
            let entity = self.one(store, &key).map_err(|e| match e {
                // A dangling index entry is an invariant violation, not a
                // caller mistake.
                GateError::NotFound(_) => GateError::Human(format!(
                    "index {}/{index} points at missing key {}",
                    self.name,
                    hex::encode(&key)
                )),
                other => other,
            })?;
            out.push((key, entity));
        }
        Ok(out)
    }

    /// Delete an entity and its index entries.
    pub fn delete(&self, store: &mut dyn KvStore, key: &[u8]) -> Result<(), GateError> {
        let entity = self.one(&*store, key)?;
        self.remove_index_entries(store, key, &entity)?;
        store.delete(&db_key(self.name, key))
    }

    fn load(&self, store: &dyn KvRead, key: &[u8]) -> Result<Option<M>, GateError> {
        match store.get(&db_key(self.name, key))? {
            Some(raw) => {
                let entity = bincode::deserialize(&raw)
                    .map_err(|e| GateError::Storage(format!("corrupt {} record: {e}", self.name)))?;
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    fn insert_index_entries(
        &self,
        store: &mut dyn KvStore,
        key: &[u8],
        entity: &M,
    ) -> Result<(), GateError> {
        for idx in &self.indexes {
            for ik in (idx.indexer)(entity) {
                let entry = if idx.unique {
                    index_key(self.name, idx.name, &ik)
                } else {
                    index_entry_key(self.name, idx.name, &ik, key)
                };
                store.put(&entry, key)?;
            }
        }
        Ok(())
    }

    fn remove_index_entries(
        &self,
        store: &mut dyn KvStore,
        key: &[u8],
        entity: &M,
    ) -> Result<(), GateError> {
        for idx in &self.indexes {
            for ik in (idx.indexer)(entity) {
                let entry = if idx.unique {
                    index_key(self.name, idx.name, &ik)
                } else {
                    index_entry_key(self.name, idx.name, &ik, key)
                };
                store.delete(&entry)?;
            }
        }
        Ok(())
    }
}
