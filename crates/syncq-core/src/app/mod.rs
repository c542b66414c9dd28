//! Application layer - エンジン本体とその起動・実行
//!
//! # コンポーネント
//! - **SyncEngine**: キュー / quarantine 操作と観測用の状態
//! - **coordinator**: `SyncEngine::sync_now` の drain ループ
//! - **SyncEngineBuilder**: ワイヤリングと起動時検証
//! - **SyncWorker**: 接続復帰・手動・定期トリガーで同期を起動するバックグラウンドタスク
//! - **QueueStats**: 時点ごとの集計

pub mod builder;
mod coordinator;
pub mod engine;
pub mod status;
pub mod worker;

pub use self::builder::{BuildError, SyncEngineBuilder};
pub use self::engine::SyncEngine;
pub use self::status::QueueStats;
pub use self::worker::{SyncWorker, WorkerOptions};
