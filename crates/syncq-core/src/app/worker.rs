//! SyncWorker - 同期 run を起動するバックグラウンドタスク
//!
//! # トリガー
//! - 接続が offline → online に変化
//! - [`SyncWorker::trigger`]（手動の「今すぐ同期」）
//! - online 中の定期 tick（任意）
//! - 起動時に 1 回（設定されていて online の場合）
//!
//! run 実行中のトリガーは捨てます。shutdown は実行中の run をキャンセルし、
//! 中断された action は永続化済みの `attempts` のままキュー先頭に残ります。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::engine::SyncEngine;
use crate::config::SyncConfig;
use crate::domain::SyncState;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerOptions {
    pub periodic_interval: Option<Duration>,
    pub sync_on_startup: bool,
}

impl From<&SyncConfig> for WorkerOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            periodic_interval: config.periodic_interval(),
            sync_on_startup: config.sync.sync_on_startup,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Startup,
    Online,
    Manual,
    Periodic,
}

/// バックグラウンド同期タスクのハンドル
/// - ハンドルを drop してもタスクは止まらない（`shutdown_and_join` を呼ぶ）
/// - run 実行中やタスク終了後の `trigger()` は何もしない
pub struct SyncWorker {
    engine: SyncEngine,
    manual: Arc<Notify>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SyncWorker {
    pub fn spawn(engine: SyncEngine, options: WorkerOptions) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let manual = Arc::new(Notify::new());

        let join = tokio::spawn(supervise(
            engine.clone(),
            Arc::clone(&manual),
            shutdown_rx,
            options,
        ));

        Self {
            engine,
            manual,
            shutdown_tx,
            join,
        }
    }

    /// Ask for a run now. Returns false if one is already in progress or the
    /// worker task has exited.
    pub fn trigger(&self) -> bool {
        if self.join.is_finished() {
            warn!("sync worker is not running, manual trigger dropped");
            return false;
        }
        if self.engine.status().state == SyncState::Syncing {
            debug!("sync already running, manual trigger dropped");
            return false;
        }
        self.manual.notify_one();
        true
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn supervise(
    engine: SyncEngine,
    manual: Arc<Notify>,
    mut shutdown_rx: watch::Receiver<bool>,
    options: WorkerOptions,
) {
    let mut connectivity = engine.inner.connectivity.subscribe();
    let mut was_online = connectivity.borrow_and_update().is_online();
    let mut monitor_alive = true;

    let mut ticker = options.periodic_interval.map(|period| {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    info!(
        periodic = ?options.periodic_interval,
        online = was_online,
        "sync worker started"
    );

    if options.sync_on_startup && was_online {
        run(&engine, Trigger::Startup, &mut shutdown_rx).await;
    }

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let trigger = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            changed = connectivity.changed(), if monitor_alive => {
                if changed.is_err() {
                    monitor_alive = false;
                    continue;
                }
                let online = connectivity.borrow_and_update().is_online();
                let came_online = online && !was_online;
                was_online = online;
                if !came_online {
                    continue;
                }
                Trigger::Online
            }
            _ = manual.notified() => Trigger::Manual,
            _ = tick(&mut ticker) => {
                if !engine.is_online() {
                    continue;
                }
                Trigger::Periodic
            }
        };

        run(&engine, trigger, &mut shutdown_rx).await;
    }

    info!("sync worker stopped");
}

async fn run(engine: &SyncEngine, trigger: Trigger, shutdown_rx: &mut watch::Receiver<bool>) {
    debug!(?trigger, "sync triggered");
    tokio::select! {
        report = engine.sync_now() => {
            if report.is_none() {
                debug!(?trigger, "run already in progress");
            }
        }
        _ = shutdown_rx.wait_for(|stop| *stop) => {
            info!("shutdown during sync run");
        }
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
