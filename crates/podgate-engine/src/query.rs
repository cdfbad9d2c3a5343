use std::collections::BTreeMap;

use podgate_core::error::GateError;
use podgate_core::kv::KvRead;
use podgate_store::bucket::{bucket_prefix, db_key, index_key, index_scan_prefix};

// ── Id encoders ──────────────────────────────────────────────────────────────

/// How a route's primary keys translate to and from their human-readable
/// form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdEncoder {
    /// Key bytes are a UTF-8 string id (e.g. artifact image references).
    Raw,
    /// 8-byte big-endian numeric id (roles, principals).
    U64BigEndian,
    /// 20-byte address.
    Address,
    /// 8-byte id followed by a 4-byte big-endian version, shown as
    /// `id/version`.
    IdVersion,
}

impl IdEncoder {
    /// Render a primary key for display.
    pub fn encode_key(&self, key: &[u8]) -> String {
        match self {
            IdEncoder::Raw => String::from_utf8_lossy(key).into_owned(),
            IdEncoder::U64BigEndian => match <[u8; 8]>::try_from(key) {
                Ok(arr) => u64::from_be_bytes(arr).to_string(),
                Err(_) => hex::encode(key),
            },
            IdEncoder::Address => hex::encode(key),
            IdEncoder::IdVersion => {
                if key.len() == 12 {
                    let id = u64::from_be_bytes(key[..8].try_into().unwrap());
                    let version = u32::from_be_bytes(key[8..].try_into().unwrap());
                    format!("{id}/{version}")
                } else {
                    hex::encode(key)
                }
            }
        }
    }

    /// Parse a display id back into key bytes.
    pub fn decode_id(&self, s: &str) -> Result<Vec<u8>, GateError> {
        match self {
            IdEncoder::Raw => Ok(s.as_bytes().to_vec()),
            IdEncoder::U64BigEndian => {
                let n: u64 = s
                    .parse()
                    .map_err(|_| GateError::Invalid(format!("not a numeric id: {s:?}")))?;
                Ok(n.to_be_bytes().to_vec())
            }
            IdEncoder::Address => {
                hex::decode(s).map_err(|e| GateError::Invalid(format!("not an address: {e}")))
            }
            IdEncoder::IdVersion => {
                let (id, version) = s
                    .split_once('/')
                    .ok_or_else(|| GateError::Invalid(format!("want id/version, got {s:?}")))?;
                let id: u64 = id
                    .parse()
                    .map_err(|_| GateError::Invalid(format!("not a numeric id: {id:?}")))?;
                let version: u32 = version
                    .parse()
                    .map_err(|_| GateError::Invalid(format!("not a version: {version:?}")))?;
                let mut out = id.to_be_bytes().to_vec();
                out.extend_from_slice(&version.to_be_bytes());
                Ok(out)
            }
        }
    }
}

// ── Results ──────────────────────────────────────────────────────────────────

/// Parallel key/value sequences returned by a query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub keys: Vec<Vec<u8>>,
    pub values: Vec<Vec<u8>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Length-prefixed wire encoding: each sequence is a u32 count followed
    /// by `u32 length || bytes` entries, keys first.
    pub fn encode(&self) -> Vec<u8> {
        fn encode_seq(out: &mut Vec<u8>, seq: &[Vec<u8>]) {
            out.extend_from_slice(&(seq.len() as u32).to_be_bytes());
            for entry in seq {
                out.extend_from_slice(&(entry.len() as u32).to_be_bytes());
                out.extend_from_slice(entry);
            }
        }
        let mut out = Vec::new();
        encode_seq(&mut out, &self.keys);
        encode_seq(&mut out, &self.values);
        out
    }

    pub fn decode(raw: &[u8]) -> Result<Self, GateError> {
        fn decode_seq(raw: &[u8], pos: &mut usize) -> Result<Vec<Vec<u8>>, GateError> {
            let take = |raw: &[u8], pos: &mut usize, n: usize| -> Result<Vec<u8>, GateError> {
                let end = pos
                    .checked_add(n)
                    .filter(|&end| end <= raw.len())
                    .ok_or_else(|| GateError::Invalid("truncated result set".into()))?;
                let out = raw[*pos..end].to_vec();
                *pos = end;
                Ok(out)
            };
            let count = u32::from_be_bytes(
                take(raw, pos, 4)?
                    .try_into()
                    .expect("four bytes were taken"),
            );
            let mut seq = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let len = u32::from_be_bytes(
                    take(raw, pos, 4)?
                        .try_into()
                        .expect("four bytes were taken"),
                );
                seq.push(take(raw, pos, len as usize)?);
            }
            Ok(seq)
        }

        let mut pos = 0;
        let keys = decode_seq(raw, &mut pos)?;
        let values = decode_seq(raw, &mut pos)?;
        if keys.len() != values.len() {
            return Err(GateError::Invalid("result sequences differ in length".into()));
        }
        Ok(Self { keys, values })
    }
}

// ── Router ───────────────────────────────────────────────────────────────────

enum RouteKind {
    Bucket {
        bucket: &'static str,
    },
    Index {
        bucket: &'static str,
        index: &'static str,
        unique: bool,
    },
}

struct QueryRoute {
    kind: RouteKind,
    id_encoder: IdEncoder,
}

/// Read-side path dispatch. Paths take the form `/<bucket>` (primary key)
/// or `/<bucket>/<index>`; a `?prefix` suffix on the query path switches to
/// prefix scanning.
#[derive(Default)]
pub struct QueryRouter {
    routes: BTreeMap<String, QueryRoute>,
}

impl QueryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_bucket(&mut self, path: &str, bucket: &'static str, id_encoder: IdEncoder) {
        self.routes.insert(
            path.to_string(),
            QueryRoute {
                kind: RouteKind::Bucket { bucket },
                id_encoder,
            },
        );
    }

    pub fn register_index(
        &mut self,
        path: &str,
        bucket: &'static str,
        index: &'static str,
        unique: bool,
        id_encoder: IdEncoder,
    ) {
        self.routes.insert(
            path.to_string(),
            QueryRoute {
                kind: RouteKind::Index {
                    bucket,
                    index,
                    unique,
                },
                id_encoder,
            },
        );
    }

    /// The id encoder registered for `path`, for display purposes.
    pub fn id_encoder(&self, path: &str) -> Option<IdEncoder> {
        let (path, _) = split_mod(path);
        self.routes.get(path).map(|r| r.id_encoder)
    }

    /// Run a query. `data` is the lookup key (primary key bytes, index key
    /// bytes, or a key prefix when the path carries `?prefix`).
    pub fn query(
        &self,
        store: &dyn KvRead,
        path: &str,
        data: &[u8],
    ) -> Result<QueryResult, GateError> {
        let (path, by_prefix) = split_mod(path);
        let route = self
            .routes
            .get(path)
            .ok_or_else(|| GateError::NotFound(format!("no query handler for {path:?}")))?;

        match &route.kind {
            RouteKind::Bucket { bucket } => {
                if by_prefix {
                    let mut res = QueryResult::default();
                    let strip = bucket_prefix(bucket).len();
                    for (k, v) in store.prefix_scan(&db_key(bucket, data))? {
                        res.keys.push(k[strip..].to_vec());
                        res.values.push(v);
                    }
                    Ok(res)
                } else {
                    match store.get(&db_key(bucket, data))? {
                        Some(value) => Ok(QueryResult {
                            keys: vec![data.to_vec()],
                            values: vec![value],
                        }),
                        None => Ok(QueryResult::default()),
                    }
                }
            }
            RouteKind::Index {
                bucket,
                index,
                unique,
            } => {
                let primaries: Vec<Vec<u8>> = if by_prefix {
                    // Scanning the bare index prefix covers every index key
                    // starting with `data`, for unique and multi alike.
                    store
                        .prefix_scan(&index_key(bucket, index, data))?
                        .into_iter()
                        .map(|(_, primary)| primary)
                        .collect()
                } else if *unique {
                    match store.get(&index_key(bucket, index, data))? {
                        Some(primary) => vec![primary],
                        None => Vec::new(),
                    }
                } else {
                    store
                        .prefix_scan(&index_scan_prefix(bucket, index, data))?
                        .into_iter()
                        .map(|(_, primary)| primary)
                        .collect()
                };

                let mut res = QueryResult::default();
                for primary in primaries {
                    let value = store.get(&db_key(bucket, &primary))?.ok_or_else(|| {
                        GateError::Human(format!(
                            "index {bucket}/{index} points at missing key {}",
                            hex::encode(&primary)
                        ))
                    })?;
                    res.keys.push(primary);
                    res.values.push(value);
                }
                Ok(res)
            }
        }
    }
}

fn split_mod(path: &str) -> (&str, bool) {
    match path.strip_suffix("?prefix") {
        Some(stripped) => (stripped, true),
        None => (path, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podgate_core::kv::KvStore;
    use podgate_store::MemStore;

    fn seeded_router() -> (MemStore, QueryRouter) {
        let mut store = MemStore::new();
        // Two artifacts sharing a checksum, bucket layout as written by the
        // model bucket.
        store.put(b"artifact:a/one:v1", b"value-one").unwrap();
        store.put(b"artifact:b/two:v2", b"value-two").unwrap();
        store
            .put(b"_i.artifact_checksum:sum:a/one:v1", b"a/one:v1")
            .unwrap();
        store
            .put(b"_i.artifact_checksum:sum:b/two:v2", b"b/two:v2")
            .unwrap();

        let mut qr = QueryRouter::new();
        qr.register_bucket("/artifacts", "artifact", IdEncoder::Raw);
        qr.register_index("/artifacts/checksum", "artifact", "checksum", false, IdEncoder::Raw);
        (store, qr)
    }

    #[test]
    fn query_by_primary_key() {
        let (store, qr) = seeded_router();
        let res = qr.query(&store, "/artifacts", b"a/one:v1").unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res.keys[0], b"a/one:v1".to_vec());
        assert_eq!(res.values[0], b"value-one".to_vec());
    }

    #[test]
    fn query_missing_key_is_empty() {
        let (store, qr) = seeded_router();
        let res = qr.query(&store, "/artifacts", b"nope").unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn query_by_index() {
        let (store, qr) = seeded_router();
        let res = qr.query(&store, "/artifacts/checksum", b"sum").unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res.keys[0], b"a/one:v1".to_vec());
        assert_eq!(res.values[1], b"value-two".to_vec());
    }

    #[test]
    fn query_by_prefix() {
        let (store, qr) = seeded_router();
        let res = qr.query(&store, "/artifacts?prefix", b"a/").unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res.keys[0], b"a/one:v1".to_vec());
    }

    #[test]
    fn unknown_path_is_not_found() {
        let (store, qr) = seeded_router();
        let err = qr.query(&store, "/unknown", b"x").unwrap_err();
        assert_eq!(err.kind(), podgate_core::error::ErrorKind::NotFound);
    }

    #[test]
    fn result_encoding_round_trips() {
        let res = QueryResult {
            keys: vec![b"k1".to_vec(), b"k2".to_vec()],
            values: vec![b"v1".to_vec(), Vec::new()],
        };
        assert_eq!(QueryResult::decode(&res.encode()).unwrap(), res);
    }

    #[test]
    fn truncated_encoding_is_invalid() {
        let res = QueryResult {
            keys: vec![b"k1".to_vec()],
            values: vec![b"v1".to_vec()],
        };
        let raw = res.encode();
        assert!(QueryResult::decode(&raw[..raw.len() - 1]).is_err());
    }

    #[test]
    fn id_encoders_round_trip() {
        assert_eq!(IdEncoder::Raw.encode_key(b"foo/bar:v1"), "foo/bar:v1");
        assert_eq!(IdEncoder::Raw.decode_id("foo/bar:v1").unwrap(), b"foo/bar:v1".to_vec());

        let key = 42u64.to_be_bytes();
        assert_eq!(IdEncoder::U64BigEndian.encode_key(&key), "42");
        assert_eq!(IdEncoder::U64BigEndian.decode_id("42").unwrap(), key.to_vec());

        let addr = [7u8; 20];
        let shown = IdEncoder::Address.encode_key(&addr);
        assert_eq!(IdEncoder::Address.decode_id(&shown).unwrap(), addr.to_vec());

        let mut idv = 5u64.to_be_bytes().to_vec();
        idv.extend_from_slice(&3u32.to_be_bytes());
        assert_eq!(IdEncoder::IdVersion.encode_key(&idv), "5/3");
        assert_eq!(IdEncoder::IdVersion.decode_id("5/3").unwrap(), idv);
    }
}
