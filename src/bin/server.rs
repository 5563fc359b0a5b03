//! gridstore Server Binary
//!
//! Starts the TCP server for gridstore.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use gridstore::network::Server;
use gridstore::{Config, TableStoreService};
use tracing_subscriber::{fmt, EnvFilter};

/// gridstore Server
#[derive(Parser, Debug)]
#[command(name = "gridstore-server")]
#[command(about = "Concurrent table store for shared spreadsheet grids")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:5002")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Worker threads running store operations
    #[arg(short, long, default_value = "40")]
    workers: usize,

    /// Operations allowed to queue for a worker before callers block
    #[arg(short, long, default_value = "256")]
    queue_capacity: usize,

    /// Per-call deadline in milliseconds (0 = wait indefinitely)
    #[arg(short = 't', long, default_value = "0")]
    call_timeout_ms: u64,

    /// Idle connection timeout in milliseconds (0 = never)
    #[arg(long, default_value = "30000")]
    read_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gridstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("gridstore Server v{}", gridstore::VERSION);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("Workers: {} (queue {})", args.workers, args.queue_capacity);

    // Build config from args
    let call_timeout = (args.call_timeout_ms > 0).then(|| Duration::from_millis(args.call_timeout_ms));
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .queue_capacity(args.queue_capacity)
        .call_timeout(call_timeout)
        .read_timeout_ms(args.read_timeout_ms)
        .build();

    // Start the service
    let service = match TableStoreService::open(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to start service: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Service initialized successfully");

    // Start server
    let server = match Server::bind(config, Arc::clone(&service)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    service.shutdown();
    tracing::info!("Server stopped");
}
