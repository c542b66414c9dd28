//! ConnectivityMonitor port - online / offline の通知
//!
//! プラットフォームのネットワーク監視を [`Connectivity`] の `watch` チャネルに
//! 落とし込みます。
//!
//! # coordinator 側の扱い
//! - `Online` への変化: 同期のトリガー
//! - `Offline` への変化: 実行中の drain ループを中断

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

pub trait ConnectivityMonitor: Send + Sync {
    /// 常に最新の状態を保持する receiver を返す
    fn subscribe(&self) -> watch::Receiver<Connectivity>;
}

impl<M: ConnectivityMonitor + ?Sized> ConnectivityMonitor for std::sync::Arc<M> {
    fn subscribe(&self) -> watch::Receiver<Connectivity> {
        (**self).subscribe()
    }
}

/// `rx` が `Offline` になった時点で完了する。
/// online のまま sender が drop された場合は完了しない。
pub(crate) async fn wait_offline(rx: &mut watch::Receiver<Connectivity>) {
    let sender_gone = rx.wait_for(|c| !c.is_online()).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}
