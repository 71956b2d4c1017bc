use anyhow::Result;
use clap::Parser;
use job_scout::cli::{handle_command, Cli};
use job_scout::{core::ConfigManager, logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration using unified ConfigManager
    let config = ConfigManager::load()?;
    config.ensure_directories().await?;

    // Logging is installed once, before anything else runs
    let _logging = logging::init(&config.logging)?;

    info!("Starting job-scout");
    info!("Environment: {}", config.environment);
    info!("Production mode: {}", config.scraper.production);
    info!("Broker: {}", config.broker.url);
    info!("Matching service: {}", config.matching.url);

    handle_command(cli, config).await
}
