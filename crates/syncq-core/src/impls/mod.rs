//! Implementations - core クレートに同梱する port 実装
//!
//! - **InMemoryStore**: テスト・一時セッション用（save 失敗の注入が可能）
//! - **JsonFileStore**: 単一 JSON ファイル、atomic に置き換え
//! - **ManualConnectivity**: 明示的な呼び出しで接続状態を更新
//! - **NoopEventSink** / **BroadcastEventSink**: イベント通知

pub mod connectivity;
pub mod event_sink;
pub mod json_file_store;
pub mod memory_store;

pub use self::connectivity::ManualConnectivity;
pub use self::event_sink::{BroadcastEventSink, NoopEventSink};
pub use self::json_file_store::JsonFileStore;
pub use self::memory_store::InMemoryStore;
