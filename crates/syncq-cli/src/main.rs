use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use syncq_core::domain::{ActionId, QuarantinedAction, QueuedAction};
use syncq_core::impls::JsonFileStore;
use syncq_core::{QueueStats, SyncConfig, SyncEngine, SyncEngineBuilder};
use tracing_subscriber::EnvFilter;

mod demo;

/// Inspect and manage an offline mutation queue stored as JSON.
#[derive(Debug, Parser)]
#[command(name = "syncq", version, about)]
struct Cli {
    /// Queue snapshot file.
    #[arg(long, env = "SYNCQ_STORE", default_value = "syncq-queue.json", global = true)]
    store: PathBuf,

    /// TOML config file. Missing file means defaults.
    #[arg(long, env = "SYNCQ_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show queue counts and the pending actions.
    Status,

    /// Queue one action.
    Enqueue {
        /// Action kind, e.g. `payments.send_money.v1`.
        kind: String,
        /// JSON payload.
        #[arg(default_value = "{}")]
        payload: String,
    },

    /// Inspect or resolve quarantined actions.
    Quarantine {
        #[command(subcommand)]
        command: QuarantineCommand,
    },

    /// Drop every pending action (logout). Quarantine is kept unless asked.
    Reset {
        #[arg(long)]
        include_quarantine: bool,
    },

    /// Run a sync session against a simulated, unreliable remote.
    Demo(demo::DemoArgs),
}

#[derive(Debug, Subcommand)]
enum QuarantineCommand {
    List,
    /// Re-queue one action at the tail.
    Retry { id: ActionId },
    /// Re-queue every quarantined action.
    RetryAll,
    /// Permanently drop one action.
    Discard { id: ActionId },
    /// Permanently drop every quarantined action.
    Clear,
}

#[derive(Debug, Serialize)]
struct StatusView {
    stats: QueueStats,
    pending: Vec<QueuedAction>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Status => {
            let engine = open(&cli.store, &config).await?;
            let view = StatusView {
                stats: engine.stats().await,
                pending: engine.queued().await,
            };
            if cli.json {
                print_json(&view)?;
            } else {
                print_status(&view);
            }
        }
        Command::Enqueue { kind, payload } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("payload is not valid JSON")?;
            let engine = open(&cli.store, &config).await?;
            let id = engine.enqueue(kind, payload).await?;
            println!("{id}");
        }
        Command::Quarantine { command } => {
            let engine = open(&cli.store, &config).await?;
            quarantine(&engine, command, cli.json).await?;
        }
        Command::Reset { include_quarantine } => {
            let engine = open(&cli.store, &config).await?;
            let drained = engine.drain_all().await?;
            println!("dropped {} pending action(s)", drained.len());
            if include_quarantine {
                let cleared = engine.clear_quarantine().await?;
                println!("dropped {} quarantined action(s)", cleared.len());
            }
        }
        Command::Demo(args) => {
            demo::run(&cli.store, config, cli.config.is_some(), args).await?;
        }
    }
    Ok(())
}

async fn quarantine(engine: &SyncEngine, command: QuarantineCommand, json: bool) -> Result<()> {
    match command {
        QuarantineCommand::List => {
            let entries = engine.list_quarantined().await;
            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("quarantine is empty");
            } else {
                for entry in &entries {
                    print_quarantined(entry);
                }
            }
        }
        QuarantineCommand::Retry { id } => {
            engine.retry(id).await?;
            println!("re-queued {id}");
        }
        QuarantineCommand::RetryAll => {
            let ids = engine.retry_all_quarantined().await?;
            println!("re-queued {} action(s)", ids.len());
        }
        QuarantineCommand::Discard { id } => {
            let entry = engine.discard(id).await?;
            println!("discarded {} ({})", entry.id(), entry.action.kind());
        }
        QuarantineCommand::Clear => {
            let cleared = engine.clear_quarantine().await?;
            println!("discarded {} action(s)", cleared.len());
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let config = match path {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let mut config = SyncConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

/// Engine for one-shot commands. Nothing is dispatched, so no handlers.
async fn open(store: &Path, config: &SyncConfig) -> Result<SyncEngine> {
    if store.is_dir() {
        bail!("{} is a directory, expected a file", store.display());
    }
    let engine = SyncEngineBuilder::new(JsonFileStore::new(store))
        .config(config)
        .build()
        .await
        .with_context(|| format!("failed to open queue at {}", store.display()))?;
    Ok(engine)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_status(view: &StatusView) {
    let stats = &view.stats;
    println!("pending:     {}", stats.pending);
    println!("quarantined: {}", stats.quarantined);
    if let Some(oldest) = stats.oldest_pending {
        println!("oldest:      {oldest}");
    }
    for (kind, count) in &stats.pending_by_kind {
        println!("  {kind}: {count}");
    }
    for action in &view.pending {
        println!(
            "{}  {}  attempts={}  enqueued={}",
            action.id(),
            action.kind(),
            action.attempts(),
            action.enqueued_at()
        );
    }
}

fn print_quarantined(entry: &QuarantinedAction) {
    println!(
        "{}  {}  attempts={}  failed={}  error={}",
        entry.id(),
        entry.action.kind(),
        entry.action.attempts(),
        entry.failed_at,
        entry.error
    );
}
