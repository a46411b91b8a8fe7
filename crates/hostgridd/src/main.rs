//! hostgridd — the Hostgrid daemon.
//!
//! Assembles the tenant registry:
//! - State store (redb)
//! - CNAME resolver (hickory)
//! - REST API
//!
//! # Usage
//!
//! ```text
//! hostgridd serve --config /etc/hostgrid/hostgrid.toml --port 8443
//! ```

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,hostgridd=debug,hostgrid=debug";

#[derive(Parser)]
#[command(name = "hostgridd", about = "Hostgrid daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the registry API.
    Serve {
        /// Path to hostgrid.toml. Built-in defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides `server.port`).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for persistent state (overrides `server.data_dir`).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Emit logs as JSON lines.
        #[arg(long)]
        log_json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            port,
            data_dir,
            log_json,
        } => {
            init_tracing(log_json)?;
            let overrides = serve::Overrides { port, data_dir };
            serve::run(config.as_deref(), overrides).await
        }
    }
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(DEFAULT_LOG_FILTER)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
