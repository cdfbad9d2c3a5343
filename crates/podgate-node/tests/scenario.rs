//! End-to-end scenarios over the full stack: signature verification, RBAC
//! expansion, permission checks, the artifact handlers, the query router,
//! and the admission webhook surface.
//!
//! Run with:
//!   cargo test -p podgate-node --test scenario

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use podgate_artifact::Artifact;
use podgate_core::msg::{CreateArtifactMsg, DeleteArtifactMsg, Metadata, Msg};
use podgate_core::tx::Tx;
use podgate_core::types::Address;
use podgate_crypto::KeyPair;
use podgate_engine::query::QueryRouter;
use podgate_engine::TxEngine;
use podgate_node::{apply_genesis, build_engine, build_query_router, GenesisFile};
use podgate_store::MemStore;
use podgate_webhook::server::{router, AppState};
use podgate_webhook::PodValidator;

const CHAIN_ID: &str = "podgate-test-1";
const CHECKSUM: &str = "myChecksum123456";

// ── Keys and genesis ──────────────────────────────────────────────────────────

fn alice() -> KeyPair {
    KeyPair::from_seed([1u8; 32])
}

fn bob() -> KeyPair {
    KeyPair::from_seed([2u8; 32])
}

fn carol() -> KeyPair {
    KeyPair::from_seed([3u8; 32])
}

/// Genesis: role 1 "admin" holds the `_podgate.*` wildcard and is bound to
/// alice and bob; role 2 "devops" inherits admin (no own permissions) and
/// is bound to carol. One artifact owned by alice is pre-registered.
fn genesis() -> GenesisFile {
    serde_json::from_value(serde_json::json!({
        "chain_id": CHAIN_ID,
        "artifacts": [
            {"image": "genesis/app:v1", "checksum": "genesisChecksum0", "owner": alice().address.to_hex()}
        ],
        "rbac": {
            "roles": [
                {"name": "admin", "owner": alice().address.to_hex(), "permissions": ["_podgate.*"]},
                {"name": "devops", "owner": alice().address.to_hex(), "role_ids": [1]}
            ],
            "principals": [
                {"name": "alice", "signatures": [{"name": "alice-key", "address": alice().address.to_hex()}]},
                {"name": "bob", "signatures": [{"name": "bob-key", "address": bob().address.to_hex()}]},
                {"name": "carol", "signatures": [{"name": "carol-key", "address": carol().address.to_hex()}]}
            ],
            "role_bindings": [
                {"role_id": 1, "signature": alice().address.to_hex()},
                {"role_id": 1, "signature": bob().address.to_hex()},
                {"role_id": 2, "signature": carol().address.to_hex()}
            ]
        }
    }))
    .expect("static genesis parses")
}

fn setup() -> (MemStore, TxEngine, QueryRouter) {
    let mut store = MemStore::new();
    apply_genesis(&mut store, &genesis()).expect("genesis applies");
    (store, build_engine(CHAIN_ID), build_query_router())
}

// ── Transaction helpers ───────────────────────────────────────────────────────

fn signed(msg: Msg, kp: &KeyPair, nonce: u64) -> Vec<u8> {
    let mut tx = Tx::new(msg);
    tx.signatures
        .push(kp.sign_msg(CHAIN_ID, nonce, &tx.msg.encode().unwrap()));
    tx.encode().unwrap()
}

fn create_msg(image: &str, owner: Option<Address>) -> Msg {
    Msg::CreateArtifact(CreateArtifactMsg {
        metadata: Metadata::new(),
        image: image.into(),
        checksum: CHECKSUM.into(),
        owner,
    })
}

fn delete_msg(image: &str) -> Msg {
    Msg::DeleteArtifact(DeleteArtifactMsg {
        metadata: Metadata::new(),
        image: image.into(),
    })
}

fn store_dump(store: &MemStore) -> Vec<(Vec<u8>, Vec<u8>)> {
    use podgate_core::kv::KvRead;
    store.prefix_scan(b"").unwrap()
}

// ── S1/S2: create then query ──────────────────────────────────────────────────

#[test]
fn create_then_query_by_image() {
    let (mut store, engine, query) = setup();

    let raw = signed(create_msg("foo/bar:v0.0.1", Some(alice().address)), &alice(), 0);
    let res = engine.deliver_tx(&mut store, &raw);
    assert_eq!(res.code, 0, "deliver failed: {}", res.log);
    assert_eq!(res.data, b"foo/bar:v0.0.1".to_vec());

    let result = query.query(&store, "/artifacts", b"foo/bar:v0.0.1").unwrap();
    assert_eq!(result.len(), 1);
    let artifact: Artifact = bincode::deserialize(&result.values[0]).unwrap();
    assert_eq!(artifact.image, "foo/bar:v0.0.1");
    assert_eq!(artifact.checksum, CHECKSUM);
    assert_eq!(artifact.owner, alice().address);
}

#[test]
fn query_by_checksum_index() {
    let (mut store, engine, query) = setup();
    let raw = signed(create_msg("foo/bar:v0.0.1", None), &alice(), 0);
    assert_eq!(engine.deliver_tx(&mut store, &raw).code, 0);

    let result = query
        .query(&store, "/artifacts/checksum", CHECKSUM.as_bytes())
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.keys[0], b"foo/bar:v0.0.1".to_vec());

    let result = query
        .query(&store, "/artifacts/checksum", b"unknownChecksum0")
        .unwrap();
    assert!(result.is_empty());
}

// ── S3: admission allow / deny ────────────────────────────────────────────────

fn admission_review(image: &str) -> String {
    serde_json::json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "uid-1",
            "kind": {"kind": "Pod"},
            "namespace": "default",
            "operation": "CREATE",
            "object": {"spec": {"containers": [{"name": "app", "image": image}]}}
        }
    })
    .to_string()
}

#[tokio::test]
async fn admission_allow_and_deny() {
    let (mut store, engine, _) = setup();
    let raw = signed(create_msg("foo/bar:v0.0.1", None), &alice(), 0);
    assert_eq!(engine.deliver_tx(&mut store, &raw).code, 0);

    let read_store = Arc::new(store);
    let query = Arc::new(build_query_router());
    let state = Arc::new(AppState {
        validator: PodValidator::new(Arc::clone(&read_store), Arc::clone(&query), Default::default()),
        store: read_store,
        query,
        tx_sender: None,
    });
    let app = router(state, "/validate-v1-pod");

    let response = app
        .clone()
        .oneshot(
            Request::post("/validate-v1-pod")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(admission_review("foo/bar:v0.0.1")))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    assert_eq!(body["response"]["allowed"], true);
    assert_eq!(body["response"]["status"]["code"], 200);

    let response = app
        .oneshot(
            Request::post("/validate-v1-pod")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(admission_review("any/unknown:image")))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    assert_eq!(body["response"]["allowed"], false);
    assert_eq!(body["response"]["status"]["code"], 404);
}

// ── S4: delete requires owner ─────────────────────────────────────────────────

#[test]
fn delete_requires_owner() {
    let (mut store, engine, _) = setup();
    let raw = signed(create_msg("foo/bar:v0.0.1", None), &alice(), 0);
    assert_eq!(engine.deliver_tx(&mut store, &raw).code, 0);

    // Bob holds the admin wildcard but does not own the artifact.
    let before = store_dump(&store);
    let res = engine.deliver_tx(&mut store, &signed(delete_msg("foo/bar:v0.0.1"), &bob(), 0));
    assert_eq!(res.code, 403, "expected unauthorized, got: {}", res.log);
    assert_eq!(store_dump(&store), before, "failed deliver must not change the store");

    let res = engine.deliver_tx(&mut store, &signed(delete_msg("foo/bar:v0.0.1"), &alice(), 1));
    assert_eq!(res.code, 0, "owner delete failed: {}", res.log);
}

#[test]
fn signer_without_role_is_rejected_before_dispatch() {
    let (mut store, engine, _) = setup();
    let mallory = KeyPair::from_seed([9u8; 32]);
    let res = engine.deliver_tx(&mut store, &signed(create_msg("evil/app:v1", None), &mallory, 0));
    assert_eq!(res.code, 403);
}

// ── S5: role indirection with wildcard grant ─────────────────────────────────

#[test]
fn wildcard_role_grants_delete() {
    let (mut store, engine, _) = setup();

    // The genesis artifact is owned by alice; her admin binding's
    // `_podgate.*` wildcard covers `_podgate.artifacts.delete`.
    let mut tx = Tx::new(delete_msg("genesis/app:v1"));
    tx.multisig_ids = vec![1];
    tx.signatures
        .push(alice().sign_msg(CHAIN_ID, 0, &tx.msg.encode().unwrap()));
    let res = engine.deliver_tx(&mut store, &tx.encode().unwrap());
    assert_eq!(res.code, 0, "deliver failed: {}", res.log);

    let query = build_query_router();
    assert!(query
        .query(&store, "/artifacts", b"genesis/app:v1")
        .unwrap()
        .is_empty());
}

// ── S6: inheritance ──────────────────────────────────────────────────────────

#[test]
fn inherited_role_grants_permissions() {
    let (mut store, engine, _) = setup();

    // Carol is bound to devops alone, which inherits all admin permissions.
    let raw = signed(create_msg("carol/app:v1", None), &carol(), 0);
    let res = engine.deliver_tx(&mut store, &raw);
    assert_eq!(res.code, 0, "deliver failed: {}", res.log);
}

#[test]
fn role_resolution_charges_each_role_once() {
    let (mut store, engine, _) = setup();
    let raw = signed(create_msg("carol/app:v1", None), &carol(), 0);
    let res = engine.check_tx(&mut store, &raw);
    assert_eq!(res.code, 0, "check failed: {}", res.log);
    assert_eq!(res.gas_allocated, 100);
    // devops + inherited admin, 10 gas each.
    assert_eq!(res.gas_payment, 20);
}

// ── Properties ───────────────────────────────────────────────────────────────

#[test]
fn replicas_reach_identical_state() {
    let txs = vec![
        signed(create_msg("foo/bar:v0.0.1", None), &alice(), 0),
        signed(create_msg("baz/qux:v2", None), &carol(), 0),
        signed(delete_msg("foo/bar:v0.0.1"), &alice(), 1),
        // A failing transaction must fail identically on both replicas.
        signed(delete_msg("no/such:image"), &alice(), 2),
    ];

    let run = || {
        let (mut store, engine, _) = setup();
        let codes: Vec<u32> = txs
            .iter()
            .map(|raw| engine.deliver_tx(&mut store, raw).code)
            .collect();
        (codes, store_dump(&store))
    };

    let (codes_a, dump_a) = run();
    let (codes_b, dump_b) = run();
    assert_eq!(codes_a, codes_b);
    assert_eq!(dump_a, dump_b);
    assert_eq!(codes_a[3], 404);
}

#[test]
fn nonce_must_strictly_increase() {
    let (mut store, engine, _) = setup();
    assert_eq!(
        engine
            .deliver_tx(&mut store, &signed(create_msg("a/one:v1", None), &alice(), 0))
            .code,
        0
    );
    // Re-using nonce 0 is invalid.
    let res = engine.deliver_tx(&mut store, &signed(create_msg("a/two:v1", None), &alice(), 0));
    assert_eq!(res.code, 400);
    // The next valid nonce is 1.
    assert_eq!(
        engine
            .deliver_tx(&mut store, &signed(create_msg("a/two:v1", None), &alice(), 1))
            .code,
        0
    );
}

#[test]
fn check_does_not_mutate_state() {
    let (mut store, engine, _) = setup();
    let raw = signed(create_msg("foo/bar:v0.0.1", None), &alice(), 0);

    let before = store_dump(&store);
    assert_eq!(engine.check_tx(&mut store, &raw).code, 0);
    assert_eq!(store_dump(&store), before);

    // The same nonce still delivers: Check consumed nothing.
    assert_eq!(engine.deliver_tx(&mut store, &raw).code, 0);
}

#[test]
fn state_survives_restart() {
    use podgate_store::SledStore;

    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = SledStore::open(dir.path()).unwrap();
        apply_genesis(&mut store, &genesis()).unwrap();
        let engine = build_engine(CHAIN_ID);
        let raw = signed(create_msg("foo/bar:v0.0.1", None), &alice(), 0);
        assert_eq!(engine.deliver_tx(&mut store, &raw).code, 0);
        store.flush().unwrap();
    }

    let store = SledStore::open(dir.path()).unwrap();
    assert!(!store.is_empty());
    let query = build_query_router();
    assert_eq!(
        query.query(&store, "/artifacts", b"foo/bar:v0.0.1").unwrap().len(),
        1
    );
}

#[test]
fn index_stays_consistent_across_lifecycle() {
    let (mut store, engine, query) = setup();
    let raw = signed(create_msg("foo/bar:v0.0.1", None), &alice(), 0);
    assert_eq!(engine.deliver_tx(&mut store, &raw).code, 0);

    let hits = query
        .query(&store, "/artifacts/checksum", CHECKSUM.as_bytes())
        .unwrap();
    assert_eq!(hits.len(), 1);

    let raw = signed(delete_msg("foo/bar:v0.0.1"), &alice(), 1);
    assert_eq!(engine.deliver_tx(&mut store, &raw).code, 0);

    let hits = query
        .query(&store, "/artifacts/checksum", CHECKSUM.as_bytes())
        .unwrap();
    assert!(hits.is_empty());

    // The genesis artifact's index entry is untouched.
    let hits = query
        .query(&store, "/artifacts/checksum", b"genesisChecksum0")
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits.keys.iter().any(|k| k == b"genesis/app:v1"));
}
