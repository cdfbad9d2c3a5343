use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tokio::sync::{mpsc, oneshot};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use podgate_core::kv::KvRead;
use podgate_engine::query::QueryRouter;
use podgate_engine::TxResult;

use crate::admission::{AdmissionReview, JSON_CONTENT_TYPE};
use crate::validator::PodValidator;

/// Per-request timeout. The admission client gives up after ~550 ms, so
/// holding a request longer only wastes a worker.
const REQUEST_TIMEOUT: Duration = Duration::from_millis(550);

/// How long in-flight requests may drain after the first shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(9);

// ── State ────────────────────────────────────────────────────────────────────

/// A raw transaction handed to the single-writer deliver loop, with a reply
/// channel for the result.
pub struct TxRequest {
    pub raw: Vec<u8>,
    pub reply: oneshot::Sender<TxResult>,
}

pub struct AppState<S> {
    pub validator: PodValidator<S>,
    pub store: S,
    pub query: Arc<QueryRouter>,
    /// Local transaction ingress; `None` on read-only deployments.
    pub tx_sender: Option<mpsc::Sender<TxRequest>>,
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the HTTP surface: the admission path, `/healthz`, the query
/// endpoint, and the local transaction ingress.
pub fn router<S>(state: Arc<AppState<S>>, admission_path: &str) -> Router
where
    S: KvRead + Send + Sync + 'static,
{
    Router::new()
        .route(admission_path, post(handle_admission))
        .route("/healthz", get(|| async { "ok" }))
        .route("/query", post(handle_query))
        .route("/tx", post(handle_tx))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Bind and serve until SIGINT/SIGTERM; drains up to [`DRAIN_TIMEOUT`], a
/// second signal exits immediately. Bind failures surface to the caller so
/// the binary can map them to its exit code contract.
pub async fn serve(router: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "webhook server started");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("install ctrl-c handler");
    };
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining in-flight requests");

    tokio::spawn(async {
        let second = async {
            let _ = signal::ctrl_c().await;
        };
        #[cfg(unix)]
        let second_term = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("install SIGTERM handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let second_term = std::future::pending::<()>();

        tokio::select! {
            _ = second => {
                warn!("second signal received, exiting immediately");
                std::process::exit(1);
            }
            _ = second_term => {
                warn!("second signal received, exiting immediately");
                std::process::exit(1);
            }
            _ = tokio::time::sleep(DRAIN_TIMEOUT) => {
                warn!("drain deadline reached, exiting");
                std::process::exit(0);
            }
        }
    });
}

// ── Admission ────────────────────────────────────────────────────────────────

async fn handle_admission<S>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: KvRead + Send + Sync + 'static,
{
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with(JSON_CONTENT_TYPE) {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Invalid Content-Type, expect `application/json`",
        )
            .into_response();
    }
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "Empty body").into_response();
    }

    let review: AdmissionReview = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(err) => {
            warn!(error = %err, "cannot deserialize admission review");
            let resp = AdmissionReview::default().respond(
                crate::admission::AdmissionResponse::new("", false, 400, err.to_string()),
            );
            return (StatusCode::BAD_REQUEST, Json(resp)).into_response();
        }
    };

    // Outcome codes (200/404/500) live inside the response status; the
    // admission protocol itself answers 200.
    Json(state.validator.review(&review)).into_response()
}

// ── Query ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QueryRequest {
    path: String,
    /// Display-form id (image reference, numeric id, hex address).
    data: String,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    keys: Vec<String>,
    /// Hex-encoded raw record bytes.
    values: Vec<String>,
}

async fn handle_query<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<QueryRequest>,
) -> Response
where
    S: KvRead + Send + Sync + 'static,
{
    let Some(encoder) = state.query.id_encoder(&req.path) else {
        return (StatusCode::NOT_FOUND, format!("no query handler for {:?}", req.path))
            .into_response();
    };
    let data = match encoder.decode_id(&req.data) {
        Ok(data) => data,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    match state.query.query(&state.store, &req.path, &data) {
        Ok(result) => {
            let keys = result.keys.iter().map(|k| encoder.encode_key(k)).collect();
            let values = result.values.iter().map(hex::encode).collect();
            Json(QueryResponse { keys, values }).into_response()
        }
        Err(err) => {
            let code = StatusCode::from_u16(err.kind().http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (code, err.to_string()).into_response()
        }
    }
}

// ── Transaction ingress ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TxResponse {
    code: u32,
    log: String,
    /// Hex-encoded deliver result data.
    data: String,
}

async fn handle_tx<S>(State(state): State<Arc<AppState<S>>>, body: Bytes) -> Response
where
    S: KvRead + Send + Sync + 'static,
{
    let Some(sender) = &state.tx_sender else {
        return (StatusCode::NOT_FOUND, "transaction ingress disabled").into_response();
    };

    let hex_body = String::from_utf8_lossy(&body);
    let raw = match hex::decode(hex_body.trim()) {
        Ok(raw) => raw,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, format!("body must be hex: {err}")).into_response()
        }
    };

    let (reply, receiver) = oneshot::channel();
    if sender.send(TxRequest { raw, reply }).await.is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "writer loop is gone").into_response();
    }
    match receiver.await {
        Ok(result) => Json(TxResponse {
            code: result.code,
            log: result.log,
            data: hex::encode(&result.data),
        })
        .into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "writer loop dropped reply").into_response(),
    }
}
