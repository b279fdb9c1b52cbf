//! NukeKV Server Binary
//!
//! Parses flags, brings the engine up, and runs the accept loop until a
//! shutdown signal arrives. SIGINT/SIGTERM trigger the graceful drain; a
//! watchdog forces exit(1) if the drain takes longer than five seconds.

use std::net::TcpListener;
use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use nukekv::network::Server;
use nukekv::{Config, Engine};

/// How long the graceful drain may run before the watchdog gives up
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// NukeKV Server
#[derive(Parser, Debug)]
#[command(name = "nukekv-server")]
#[command(about = "In-memory persistent key-value store with native JSON documents")]
#[command(version)]
struct Args {
    /// Listen port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Snapshot file path
    #[arg(short, long, default_value = "nukekv.db")]
    database: String,

    /// Disable snapshot persistence
    #[arg(long)]
    no_persistence: bool,

    /// Disable LRU promotion and eviction
    #[arg(long)]
    no_cache: bool,

    /// Memory budget in megabytes (0 = unlimited)
    #[arg(short = 'm', long, default_value = "0")]
    max_memory_mb: u64,

    /// Worker thread count (0 = hardware threads - 1)
    #[arg(short, long, default_value = "0")]
    workers: usize,

    /// Dirty-op threshold for batched snapshots (0 = write-through)
    #[arg(short, long, default_value = "1")]
    batch_size: u64,

    /// Largest accepted frame body in bytes
    #[arg(long, default_value = "1073741824")]
    max_payload: u64,

    /// Suffix every reply with its handling duration
    #[arg(long)]
    debug: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nukekv=debug"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .port(args.port)
        .bind(args.bind)
        .database_path(args.database)
        .persistence_enabled(!args.no_persistence)
        .caching_enabled(!args.no_cache)
        .max_memory_bytes(args.max_memory_mb * 1024 * 1024)
        .worker_threads(args.workers)
        .batch_processing_size(args.batch_size)
        .max_payload_size(args.max_payload)
        .debug_mode(args.debug)
        .build();

    tracing::info!("NukeKV v{} — Protocol: Nuke-Wire (CUSTOM RAW TCP)", nukekv::VERSION);

    // Bind before anything else so a taken port fails fast.
    let listen_addr = config.listen_addr();
    let listener = match TcpListener::bind(&listen_addr) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%listen_addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };

    let engine = match Engine::open(config) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!(error = %e, "failed to open engine");
            process::exit(1);
        }
    };

    let mut server = match Server::with_listener(Arc::clone(&engine), listener) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to set up listener");
            process::exit(1);
        }
    };
    let addr = server.local_addr().expect("listener is bound");

    tracing::info!(%addr, "server is ready to accept connections");
    tracing::info!(
        workers = engine.store().worker_threads(),
        batch_size = engine.store().batch_size(),
        persistence = engine.store().persistence_enabled(),
        "engine initialized"
    );

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        if shutdown.swap(true, Ordering::Relaxed) {
            return; // second signal, watchdog already armed
        }
        tracing::info!("shutdown signal received, draining");
        thread::spawn(|| {
            thread::sleep(SHUTDOWN_GRACE);
            tracing::error!("drain timed out, forcing exit");
            process::exit(1);
        });
    }) {
        tracing::error!(error = %e, "failed to install signal handler");
        process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!(error = %e, "server error");
        process::exit(1);
    }

    engine.close();
    tracing::info!("server shut down gracefully");
}
