//! # Coverdesk Main Entry Point
//!
//! Loads configuration, then serves the API (default), applies migrations, or
//! runs a single escalation sweep.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use coverdesk::{
    ai::providers_from_config,
    config::{AppConfig, ConfigLoader},
    db,
    escalation::EscalationSweeper,
    mail::dispatcher_from_config,
    repositories::TicketRepository,
    scheduler::EscalationScheduler,
    server::{AppState, run_server},
    telemetry,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "coverdesk", version, about = "Support ticket and SLA escalation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations, start the escalation scheduler and serve HTTP
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Run one escalation sweep and exit
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;
    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config).await?;
    db::run_migrations(&db).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => Ok(()),
        Command::Sweep => {
            let sweeper = build_sweeper(&config, db)?;
            let stats = sweeper.sweep().await;
            tracing::info!(?stats, "Sweep finished");
            if stats.failed_passes > 0 {
                anyhow::bail!("{} escalation pass(es) failed", stats.failed_passes);
            }
            Ok(())
        }
        Command::Serve => serve(config, db).await,
    }
}

fn build_sweeper(
    config: &AppConfig,
    db: sea_orm::DatabaseConnection,
) -> anyhow::Result<EscalationSweeper> {
    let mailer = dispatcher_from_config(&config.mail)?;
    Ok(EscalationSweeper::new(
        TicketRepository::new(db),
        mailer,
        config.escalation.clone(),
    ))
}

async fn serve(config: AppConfig, db: sea_orm::DatabaseConnection) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let mailer = dispatcher_from_config(&config.mail)?;
    let providers = providers_from_config(&config.ai)?;

    let shutdown = CancellationToken::new();
    let scheduler = EscalationScheduler::new(
        EscalationSweeper::new(
            TicketRepository::new(db.clone()),
            mailer.clone(),
            config.escalation.clone(),
        ),
        config.escalation.tick_interval(),
    )
    .start(shutdown.clone());

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        signal_token.cancel();
    });

    let state = AppState {
        config,
        db,
        mailer,
        embedder: providers.embedder,
        completer: providers.completer,
    };

    let served = run_server(state, shutdown.clone()).await;
    shutdown.cancel();
    if let Err(err) = scheduler.await {
        tracing::error!(error = %err, "Escalation scheduler task panicked");
    }

    served
}
