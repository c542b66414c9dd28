//! syncq-core
//!
//! Offline mutation queue with a sync coordinator.
//!
//! オフライン中の action をキューに積み、変更のたびに永続化し、接続が戻ったら
//! FIFO で配送します。リモートが恒久的に拒否したものはキューを塞がないよう
//! quarantine に移します。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, action, outcome, state, report, errors, events）
//! - **ports**: 抽象化レイヤー（QueueStore, Dispatcher, ConnectivityMonitor, EventSink, Clock, IdGenerator）
//! - **queue**: mutation queue, quarantine, retry policy
//! - **app**: アプリケーションロジック（SyncEngine, coordinator, builder, worker）
//! - **typed**: 型付き action API（Action trait, Handler trait, ActionRegistry）
//! - **impls**: 実装（InMemoryStore, JsonFileStore, ManualConnectivity, event sinks）
//! - **config**: TOML 設定 + 環境変数による上書き

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod typed;

pub use app::{BuildError, QueueStats, SyncEngine, SyncEngineBuilder, SyncWorker, WorkerOptions};
pub use config::{ConfigError, SyncConfig};
pub use domain::{
    ActionId, ActionKind, DispatchResult, NewAction, QuarantinedAction, QueuedAction, RunFailure,
    RunReport, SyncError, SyncEvent, SyncState, SyncStatus,
};
pub use queue::RetryPolicy;
pub use typed::{Action, ActionContext, ActionRegistry, Handler};
