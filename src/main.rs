//! # Carillon — appointment reminder daemon
//!
//! Watches the appointment snapshot maintained by the practice software and
//! dispatches due reminders over WhatsApp click-to-chat links and a file
//! email outbox.
//!
//! Usage:
//!   carillon                      # Run the reminder loop until Ctrl-C
//!   carillon --run-now            # One manual pass for today, then exit
//!   carillon --data-dir ./state   # Keep ledger/log/outbox elsewhere

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use carillon_channels::{OutboxEmailNotifier, TracingOpener, WaLinkNotifier};
use carillon_core::CarillonConfig;
use carillon_scheduler::{ActivityLog, DedupLedger, Dispatcher, JsonFileSource, ReminderEngine};

#[derive(Parser)]
#[command(
    name = "carillon",
    version,
    about = "🔔 Carillon — appointment reminder engine"
)]
struct Cli {
    /// Config file (settings + clinic identity)
    #[arg(long, default_value = "~/.carillon/config.toml")]
    config: String,

    /// Data directory (dedup ledger, activity log, email outbox)
    #[arg(long, default_value = "~/.carillon")]
    data_dir: String,

    /// Appointment snapshot file, maintained by the upstream store
    #[arg(long, default_value = "~/.carillon/appointments.json")]
    appointments: String,

    /// Run one manual reminder pass for today's appointments, then exit
    #[arg(long)]
    run_now: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "carillon=debug,carillon_scheduler=debug,carillon_channels=debug"
    } else {
        "carillon=info,carillon_scheduler=info,carillon_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = expand_path(&cli.config);
    let data_dir = expand_path(&cli.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let config = CarillonConfig::load_from(&config_path)?;
    let poll_interval = config.scheduler.poll_interval_secs;

    let dispatcher = Dispatcher::new(
        Arc::new(WaLinkNotifier::new(TracingOpener)),
        Arc::new(OutboxEmailNotifier::new(data_dir.join("outbox"))?),
        config.clinic.clone(),
    );
    let engine = ReminderEngine::new(
        config,
        &config_path,
        Arc::new(JsonFileSource::new(expand_path(&cli.appointments))),
        dispatcher,
        DedupLedger::open(data_dir.join("sent_reminders.json")),
        ActivityLog::new(data_dir.join("reminder_log.txt")),
    );

    if cli.run_now {
        let stats = engine.run_now().await?;
        if stats.skipped_gate {
            tracing::warn!("Outside business hours — nothing sent");
        } else {
            tracing::info!(
                "Manual pass: {}/{} of today's appointments delivered",
                stats.delivered,
                stats.targeted
            );
        }
        return Ok(());
    }

    engine.start();
    tracing::info!("🔔 Carillon running (poll every {poll_interval}s) — Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    engine.stop();
    engine.persist_settings().await;
    Ok(())
}
