use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod collect;
mod config;
mod console;
mod db;
mod jobs;
mod models;
mod reconcile;
mod report;
mod store;
#[cfg(test)]
mod testing;
mod transport;
mod vocabulary;
mod workflow;

use crate::config::Settings;
use crate::console::ConsoleChannel;
use crate::db::PgStore;
use crate::jobs::JobRegistry;
use crate::reconcile::{day_window, Reconciler};
use crate::store::{MemoryStore, ProfileStore, RecordStore};
use crate::transport::Interaction;
use crate::workflow::{MoodWorkflow, SessionOutcome};

#[derive(Parser)]
#[command(name = "mood-journal")]
#[command(about = "Daily mood check-ins with one record per user and day", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Record today's mood interactively
    Mood {
        #[arg(long)]
        user: String,
        /// Keep the record in memory instead of Postgres
        #[arg(long)]
        in_memory: bool,
    },
    /// Show today's record
    Today {
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Turn the daily reminder on or off
    Reminder {
        #[arg(long)]
        user: String,
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

async fn pg_store(settings: &Settings) -> anyhow::Result<Arc<PgStore>> {
    let pool = db::connect(settings).await?;
    Ok(Arc::new(PgStore::new(pool)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::InitDb => {
            let pool = db::connect(&settings).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Mood { user, in_memory } => {
            let (profiles, records): (Arc<dyn ProfileStore>, Arc<dyn RecordStore>) = if in_memory {
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            } else {
                let store = pg_store(&settings).await?;
                (store.clone(), store)
            };

            // Reminder jobs are registered by the external scheduler; this process starts with none.
            let reconciler = Reconciler::new(profiles, records, Arc::new(JobRegistry::new()));
            let workflow = MoodWorkflow::new(reconciler, settings.deadlines());
            let interaction = Interaction::new(user.clone(), Arc::new(ConsoleChannel::new(user)));

            match workflow.run(&interaction).await? {
                SessionOutcome::Recorded(reconciliation) => {
                    println!("{}", report::describe_record(&reconciliation.record));
                }
                SessionOutcome::Aborted { stage } => {
                    tracing::debug!(%stage, "session ended without a record");
                }
            }
        }
        Commands::Today { user, json } => {
            let store = pg_store(&settings).await?;
            let (start, end) = day_window(&chrono::Local::now());
            let record = store
                .find_in_window(&user, start, end)
                .await
                .context("failed to load today's record")?;

            match (record, json) {
                (Some(record), true) => println!("{}", serde_json::to_string_pretty(&record)?),
                (Some(record), false) => println!("{}", report::describe_record(&record)),
                (None, true) => println!("null"),
                (None, false) => println!("No mood recorded today for {user}."),
            }
        }
        Commands::Report {
            user,
            since_days,
            out,
        } => {
            let store = pg_store(&settings).await?;
            let cutoff = report::cutoff(since_days);
            let records = store.records_since(&user, cutoff).await?;
            let report = report::build_report(&user, since_days, cutoff, &records);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Reminder { user, enabled } => {
            let store = pg_store(&settings).await?;
            let profile = store.set_reminder(&user, enabled).await?;
            println!(
                "Reminder for {} is {}.",
                profile.owner_id,
                if profile.reminder_enabled { "on" } else { "off" }
            );
        }
    }

    Ok(())
}
