//! CLI surface for the gateway binary.
//!
//! Provides a single `serve` subcommand; no subcommand at all is equivalent
//! to `serve` with the default configuration path.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

/// Gateway JSON-RPC request optimizer.
#[derive(Parser, Debug)]
#[command(name = "gateway")]
#[command(about = "JSON-RPC gateway that multiplexes requests across metered RPC providers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Path to a `gateway.toml` configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides the configured HTTP port.
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Runs the parsed CLI, defaulting to `serve` with no overrides.
pub async fn run(cli: Cli, data_dir: PathBuf) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve { config, port }) => {
            crate::server::run(config.as_deref().map(Path::to_path_buf), port, data_dir).await
        }
        None => crate::server::run(None, None, data_dir).await,
    }
}
