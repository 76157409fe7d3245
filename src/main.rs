use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use thorwatch::application::{Cli, CommandExecutor};
use thorwatch::shared::config::ConfigLoader;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.dry_run {
        config.alerts.do_not_alert = true;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    CommandExecutor::execute(cli.command, config).await?;
    Ok(())
}
