//! intel-sync command line
//!
//! ```text
//! intel-sync --config intel-sync.toml sync [--only "FortiGate VPN-SSL Honeypot"]
//! intel-sync --config intel-sync.toml report [--hours 24]
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use honey_store::db;
use intel_sync::{pipeline, report, SyncConfig};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "intel-sync", version, about = "Publish and report honeypot source addresses")]
struct Cli {
    /// Path to the TOML configuration
    #[arg(short, long, default_value = "intel-sync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Push newly seen source addresses to every destination
    Sync {
        /// Only sync the destination with this name
        #[arg(long)]
        only: Option<String>,
    },
    /// Print the aggregation views as JSON
    Report {
        /// Window length, overriding the configured one
        #[arg(long)]
        hours: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intel_sync=info,honey_store=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::load(&cli.config)?;

    let pool = db::create_pool(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;
    db::run_migrations(&pool).await?;

    match cli.command {
        Command::Sync { only } => sync(&config, &pool, only.as_deref()).await,
        Command::Report { hours } => {
            let hours = hours.unwrap_or(config.report.hours);
            let exfiltrated = report::load_exfiltrated(config.report.exfiltrated_passwords.as_deref()).await?;
            let report = report::build_report(&pool, hours, &exfiltrated).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn sync(config: &SyncConfig, pool: &sqlx::SqlitePool, only: Option<&str>) -> anyhow::Result<()> {
    if config.destinations.is_empty() {
        tracing::warn!("No destinations configured");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested, stopping after the current step");
            let _ = shutdown_tx.send(true);
        }
    });

    let results = pipeline::run_all(config, pool, only, shutdown_rx).await;
    if results.is_empty() {
        anyhow::bail!("no destination named {:?}", only.unwrap_or_default());
    }

    let mut failed = 0;
    for (label, result) in &results {
        if let Err(e) = result {
            tracing::error!("{}: {}", label, e);
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} destinations failed", results.len());
    }
    Ok(())
}
