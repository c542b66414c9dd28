//! Ports - 抽象化レイヤー
//!
//! エンジンの外側（永続化先、リモート API、OS のネットワーク監視など）への
//! インターフェースを trait として定義し、実装の詳細を隠蔽します。
//!
//! # 構成
//! - **QueueStore**: キューと quarantine の永続化（ファイル、KV ストアなど）
//! - **Dispatcher**: 1 件の action をリモートへ配送
//! - **ConnectivityMonitor**: online / offline の通知
//! - **EventSink**: 観測用フック
//! - **Clock** / **IdGenerator**: 時刻と ID（テストで差し替え可能）

pub mod clock;
pub mod connectivity;
pub mod dispatcher;
pub mod event_sink;
pub mod id_generator;
pub mod store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::connectivity::{Connectivity, ConnectivityMonitor};
pub use self::dispatcher::Dispatcher;
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::store::{QueueStore, SNAPSHOT_VERSION, StoreSnapshot};
