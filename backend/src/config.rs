use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// HTTP server for the weekly good-deed exchange.
#[derive(Parser, Debug, Clone)]
#[command(name = "deed-backend")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// JSON file the store is snapshotted to; in-memory only when unset
    #[arg(long, env = "PERSIST_PATH")]
    pub persist_path: Option<PathBuf>,

    /// Seed for pairing and deed selection, for reproducible rounds
    #[arg(long, env = "PAIRING_SEED")]
    pub seed: Option<u64>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}
