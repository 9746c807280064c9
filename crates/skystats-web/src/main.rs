//! Main entry point for SkyStats.

use anyhow::{Context, Result};
use clap::Parser;
use skystats_common::init_logging;
use skystats_config::ConfigLoader;
use skystats_web::SkyStatsServer;
use std::path::PathBuf;
use tracing::{error, info};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "SKYSTATS_CONFIG", default_value = "skystats.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new(&args.config)
        .load()
        .await
        .with_context(|| format!("loading {}", args.config.display()))?;
    let _log_guard = init_logging(&config.logging).context("initializing logging")?;

    info!("Starting SkyStats v{}", env!("CARGO_PKG_VERSION"));
    if args.check {
        info!("Configuration at {} is valid", args.config.display());
        return Ok(());
    }

    let server = SkyStatsServer::new(config);
    if let Err(e) = server.start().await {
        error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
