mod cli;
mod config;
mod core;
mod error;
mod models;
mod mqtt;
mod pipeline;
mod server;
mod sources;
mod state;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    // RUST_LOG wins over the plain LOG_LEVEL (e.g. "INFO") variable.
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            std::env::var("LOG_LEVEL")
                .ok()
                .filter(|level| !level.trim().is_empty())
                .and_then(|level| EnvFilter::try_new(level.trim().to_lowercase()).ok())
        })
        .unwrap_or_else(|| EnvFilter::new("albumart_bridge=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() {
    let env_file = config::load_env_file();
    init_tracing();
    if let Some(path) = env_file {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
