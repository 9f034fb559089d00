mod config;
mod server;

use clap::{Parser, Subcommand};
use config::Config;
use server::run_server;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Relay file requests between a client and a server, and track online peers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Server {
        /// Path to configuration file
        #[arg(short, long, default_value = "ferry.yaml")]
        config: String,

        /// Override the listen address
        #[arg(long)]
        bind: Option<String>,

        /// Override the data directory of the file backend
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferry=info,ferry_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            config,
            bind,
            data_dir,
        } => {
            tracing::info!("Starting Ferry server with config: {}", config);

            let mut cfg = match Config::from_file(&config) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Failed to load config: {}", e);
                    std::process::exit(1);
                }
            };

            if let Some(bind) = bind {
                cfg.server.bind_addr = bind;
            }
            if let Some(data_dir) = data_dir {
                cfg.storage.data_dir = data_dir;
            }

            tracing::info!(
                "Bind: {}, Storage: {} ({})",
                cfg.server.bind_addr,
                cfg.storage.backend,
                cfg.storage.data_dir.display()
            );

            if let Err(e) = run_server(cfg).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
