//! podgate-node — the admission-gate node binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the state database
//!   2. Apply genesis if the DB is fresh
//!   3. Spawn the single-writer deliver loop (the stand-in for the external
//!      BFT consensus engine: transactions are executed one at a time, in
//!      arrival order)
//!   4. Serve the admission webhook, query, and transaction-ingress HTTP
//!      endpoints until SIGINT/SIGTERM

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use podgate_node::{apply_genesis, build_engine, build_query_router, load_genesis};
use podgate_store::SledStore;
use podgate_webhook::server::{router, serve, AppState, TxRequest};
use podgate_webhook::PodValidator;

/// Exit code for configuration errors (bad genesis, bad flags).
const EXIT_CONFIG: i32 = 1;
/// Exit code when the listen address cannot be bound.
const EXIT_BIND: i32 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "podgate-node",
    version,
    about = "Podgate node — container-image admission gate over a replicated registry"
)]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, default_value = "~/.podgate/data")]
    home: PathBuf,

    /// HTTP listen address (admission webhook, queries, tx ingress).
    /// TLS termination is delegated to the fronting proxy.
    #[arg(long, default_value = "0.0.0.0:8443")]
    listen: SocketAddr,

    /// Path the validating webhook is registered under.
    #[arg(long, default_value = "/validate-v1-pod")]
    admission_path: String,

    /// Chain identifier bound into every signature.
    #[arg(long, default_value = "podgate-1")]
    chain_id: String,

    /// Path to the genesis JSON (only read on first run).
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Namespaces that bypass admission validation (repeatable).
    #[arg(long = "blacklist-namespace")]
    blacklist_namespaces: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,podgate=debug".parse().expect("static filter parses")),
        )
        .init();

    let args = Args::parse();
    if let Err((code, err)) = run(args).await {
        error!(error = %format!("{err:#}"), "node failed");
        std::process::exit(code);
    }
}

async fn run(args: Args) -> Result<(), (i32, anyhow::Error)> {
    info!("podgate node starting");

    // ── State database ────────────────────────────────────────────────────────
    let home = expand_tilde(&args.home);
    std::fs::create_dir_all(&home)
        .with_context(|| format!("creating data dir {}", home.display()))
        .map_err(|e| (EXIT_CONFIG, e))?;
    let mut store = SledStore::open(&home)
        .context("opening state database")
        .map_err(|e| (EXIT_CONFIG, e.into()))?;

    // ── Genesis if fresh ──────────────────────────────────────────────────────
    let mut chain_id = args.chain_id.clone();
    if store.is_empty() {
        match &args.genesis {
            Some(path) => {
                info!(path = %path.display(), "fresh database, applying genesis");
                let genesis = load_genesis(path)
                    .context("loading genesis file")
                    .map_err(|e| (EXIT_CONFIG, e))?;
                if let Some(id) = &genesis.chain_id {
                    chain_id = id.clone();
                }
                apply_genesis(&mut store, &genesis)
                    .context("applying genesis")
                    .map_err(|e| (EXIT_CONFIG, e.into()))?;
                store
                    .flush()
                    .context("flushing genesis state")
                    .map_err(|e| (EXIT_CONFIG, e.into()))?;
            }
            None => warn!("fresh database and no --genesis given, starting empty"),
        }
    } else {
        info!("existing database found, skipping genesis");
    }

    // ── Engine + single-writer loop ───────────────────────────────────────────
    let engine = build_engine(chain_id);
    let (tx_sender, mut tx_receiver) = tokio::sync::mpsc::channel::<TxRequest>(512);

    // The consensus engine is an external collaborator; this loop is its
    // interface. Transactions execute strictly one at a time, in the order
    // they arrive, against the writer's store handle.
    let mut writer_store = store.clone();
    tokio::spawn(async move {
        while let Some(req) = tx_receiver.recv().await {
            let result = engine.deliver_tx(&mut writer_store, &req.raw);
            if result.code == 0 {
                if let Err(err) = writer_store.flush() {
                    error!(error = %err, "flush after deliver failed");
                }
            }
            let _ = req.reply.send(result);
        }
    });

    // ── HTTP surface ──────────────────────────────────────────────────────────
    let read_store = Arc::new(store);
    let query = Arc::new(build_query_router());
    let state = Arc::new(AppState {
        validator: PodValidator::new(
            Arc::clone(&read_store),
            Arc::clone(&query),
            args.blacklist_namespaces.iter().cloned().collect(),
        ),
        store: read_store,
        query,
        tx_sender: Some(tx_sender),
    });

    let app = router(state, &args.admission_path);
    info!("node ready");
    serve(app, args.listen)
        .await
        .context("serving HTTP")
        .map_err(|e| (EXIT_BIND, e))?;

    info!("node stopped");
    Ok(())
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
