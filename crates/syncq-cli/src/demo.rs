//! `syncq demo`: queue actions offline, then sync them against a simulated
//! remote that is slow, occasionally unavailable, and rejects some requests.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use serde::{Deserialize, Serialize};
use syncq_core::domain::SyncState;
use syncq_core::impls::{BroadcastEventSink, JsonFileStore, ManualConnectivity};
use syncq_core::{
    Action, ActionContext, DispatchResult, Handler, SyncConfig, SyncEngine, SyncEngineBuilder,
    SyncEvent, SyncWorker, WorkerOptions,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Number of actions to queue while offline.
    #[arg(long, default_value_t = 12)]
    actions: u32,

    /// Simulated round-trip time per request.
    #[arg(long, default_value_t = 50)]
    latency_ms: u64,

    /// Every Nth request fails with a retryable error. 0 disables.
    #[arg(long, default_value_t = 4)]
    flaky_every: u32,

    /// Transfers above this amount are rejected for good.
    #[arg(long, default_value_t = 50_000)]
    limit_cents: u64,

    /// Drop connectivity for this long once half the queue is delivered.
    /// 0 disables.
    #[arg(long, default_value_t = 500)]
    outage_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SendMoney {
    to: String,
    cents: u64,
}

impl Action for SendMoney {
    const KIND: &'static str = "payments.send_money.v1";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UpdateProfile {
    display_name: String,
}

impl Action for UpdateProfile {
    const KIND: &'static str = "profile.update.v1";
}

struct RemoteState {
    requests: AtomicU32,
    latency: Duration,
    flaky_every: u32,
    limit_cents: u64,
}

/// Fake backend shared by both handlers.
#[derive(Clone)]
struct Remote(Arc<RemoteState>);

impl Remote {
    /// Latency plus the periodic 503. `None` means the request got through.
    async fn round_trip(&self) -> Option<DispatchResult> {
        tokio::time::sleep(self.0.latency).await;
        let n = self.0.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.0.flaky_every > 0 && n % self.0.flaky_every == 0 {
            return Some(DispatchResult::retryable("503 service unavailable"));
        }
        None
    }
}

#[async_trait]
impl Handler<SendMoney> for Remote {
    async fn handle(&self, action: SendMoney, ctx: ActionContext) -> DispatchResult {
        if let Some(unavailable) = self.round_trip().await {
            return unavailable;
        }
        if action.cents > self.0.limit_cents {
            return DispatchResult::fatal(format!(
                "422 transfer of {} cents exceeds limit",
                action.cents
            ));
        }
        info!(id = %ctx.id, to = %action.to, cents = action.cents, "transfer accepted");
        DispatchResult::Success
    }
}

#[async_trait]
impl Handler<UpdateProfile> for Remote {
    async fn handle(&self, action: UpdateProfile, ctx: ActionContext) -> DispatchResult {
        if let Some(unavailable) = self.round_trip().await {
            return unavailable;
        }
        if action.display_name.trim().is_empty() {
            return DispatchResult::fatal("400 display name must not be empty");
        }
        info!(id = %ctx.id, name = %action.display_name, "profile updated");
        DispatchResult::Success
    }
}

pub async fn run(store: &Path, mut config: SyncConfig, from_file: bool, args: DemoArgs) -> Result<()> {
    if !from_file {
        // keep the demo short unless the user configured delays
        config.retry.base_delay_ms = 200;
        config.retry.max_delay_ms = 2_000;
    }

    let remote = Remote(Arc::new(RemoteState {
        requests: AtomicU32::new(0),
        latency: Duration::from_millis(args.latency_ms),
        flaky_every: args.flaky_every,
        limit_cents: args.limit_cents,
    }));
    let monitor = Arc::new(ManualConnectivity::offline());
    let events = Arc::new(BroadcastEventSink::default());
    let printer = tokio::spawn(print_events(events.subscribe()));

    let engine = SyncEngineBuilder::new(JsonFileStore::new(store))
        .register::<SendMoney, _>(remote.clone())?
        .register::<UpdateProfile, _>(remote)?
        .expect_kinds(&[SendMoney::KIND, UpdateProfile::KIND])
        .connectivity(monitor.clone())
        .event_sink(events.clone())
        .config(&config)
        .build()
        .await?;

    queue_actions(&engine, args.actions, args.limit_cents).await?;
    info!(pending = engine.pending_count(), store = %store.display(), "queued while offline");

    let worker = SyncWorker::spawn(engine.clone(), WorkerOptions::from(&config));
    let outage_task = (args.outage_ms > 0).then(|| {
        tokio::spawn(outage(
            engine.clone(),
            monitor.clone(),
            Duration::from_millis(args.outage_ms),
        ))
    });

    info!("going online");
    monitor.set_online();

    tokio::select! {
        _ = settled(&engine) => {}
        _ = tokio::signal::ctrl_c() => warn!("interrupted"),
    }
    worker.shutdown_and_join().await;
    if let Some(task) = outage_task {
        task.abort();
    }

    let status = engine.status();
    let stats = engine.stats().await;
    println!();
    println!("state:       {:?}", status.state);
    if let Some(error) = &status.error {
        println!("error:       {error}");
    }
    println!("pending:     {}", stats.pending);
    println!("quarantined: {}", stats.quarantined);
    for entry in engine.list_quarantined().await {
        println!("  {}  {}  {}", entry.id(), entry.action.kind(), entry.error);
    }

    // the printer exits once the last sender is gone
    drop(engine);
    drop(events);
    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        warn!("event printer did not finish");
    }
    Ok(())
}

/// Mix of transfers and profile edits. Some transfers go over the limit and
/// some profile edits are blank, so both kinds end up in quarantine.
async fn queue_actions(engine: &SyncEngine, count: u32, limit_cents: u64) -> Result<()> {
    for i in 0..count {
        if i % 3 == 2 {
            let display_name = if i % 7 == 5 {
                String::new()
            } else {
                format!("user-{i}")
            };
            engine.enqueue_action(&UpdateProfile { display_name }).await?;
        } else {
            let cents = if i % 5 == 4 {
                limit_cents + 1
            } else {
                1_000 + u64::from(i) * 250
            };
            engine
                .enqueue_action(&SendMoney {
                    to: format!("acct-{:03}", i % 4),
                    cents,
                })
                .await?;
        }
    }
    Ok(())
}

/// One connectivity drop once the queue is half drained.
async fn outage(engine: SyncEngine, monitor: Arc<ManualConnectivity>, duration: Duration) {
    let half = engine.pending_count() / 2;
    let mut pending = engine.subscribe_pending();
    if pending.wait_for(|n| *n <= half).await.is_err() {
        return;
    }
    warn!(?duration, "connectivity lost");
    monitor.set_offline();
    tokio::time::sleep(duration).await;
    info!("connectivity restored");
    monitor.set_online();
}

/// Empty queue and no run in progress.
async fn settled(engine: &SyncEngine) {
    let mut pending = engine.subscribe_pending();
    let mut status = engine.subscribe_status();
    loop {
        if pending.wait_for(|n| *n == 0).await.is_err() {
            return;
        }
        if status.wait_for(|s| s.state != SyncState::Syncing).await.is_err() {
            return;
        }
        if engine.pending_count() == 0 {
            return;
        }
    }
}

async fn print_events(mut rx: broadcast::Receiver<SyncEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to encode event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
