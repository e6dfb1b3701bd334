use std::sync::Arc;

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use earlybird_checkin::SystemClock;
use earlybird_cli::{build_runner, summary_lines, Cli};
use earlybird_site::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let reservations = match cli.reservations() {
        Ok(reservations) => reservations,
        Err(e) => Cli::command().error(ErrorKind::WrongNumberOfValues, e).exit(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load_from(&cli.config_dir)
        .with_context(|| format!("Failed to load config from {}", cli.config_dir.display()))?;
    tracing::info!(
        site = %config.site.base_url,
        reservations = reservations.len(),
        "Starting earlybird"
    );

    let (runner, handle) = build_runner(&config, Arc::new(SystemClock))?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling pending check-ins");
            handle.shutdown();
        }
    });

    let summary = runner.run(reservations).await?;
    for line in summary_lines(&summary) {
        println!("{}", line);
    }
    Ok(())
}
