//! QueueStore port - キューと quarantine の永続化
//!
//! # 設計原則
//! - エンジンは変更のたびに、書き込みロックを保持したまま `save` を呼ぶ
//! - `save` が `Ok` を返してから新しい状態を公開する
//! - したがって save が並行することはなく、失敗時はメモリ上の状態も変わらない

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{QuarantinedAction, QueuedAction, StoreError};

/// 現在のスナップショット形式のバージョン
pub const SNAPSHOT_VERSION: u32 = 1;

/// 再起動をまたいで保持するもの（キュー順）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub queue: Vec<QueuedAction>,
    pub quarantine: Vec<QuarantinedAction>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            queue: Vec::new(),
            quarantine: Vec::new(),
        }
    }
}

impl StoreSnapshot {
    pub fn new(queue: Vec<QueuedAction>, quarantine: Vec<QuarantinedAction>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            queue,
            quarantine,
        }
    }

    /// 新しい形式で書かれたスナップショットは拒否
    pub fn check_version(&self) -> Result<(), StoreError> {
        if self.version > SNAPSHOT_VERSION {
            return Err(StoreError::Version {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }
}

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// 永続化された状態を読み込む。未保存なら空のスナップショットを返す。
    async fn load(&self) -> Result<StoreSnapshot, StoreError>;

    /// 永続化された状態を置き換える（durable に）
    async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: QueueStore + ?Sized> QueueStore for std::sync::Arc<S> {
    async fn load(&self) -> Result<StoreSnapshot, StoreError> {
        (**self).load().await
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        (**self).save(snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_current_version() {
        let snapshot = StoreSnapshot::default();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert!(snapshot.check_version().is_ok());
    }

    #[test]
    fn newer_version_is_rejected() {
        let snapshot = StoreSnapshot {
            version: SNAPSHOT_VERSION + 1,
            ..StoreSnapshot::default()
        };
        assert!(matches!(
            snapshot.check_version(),
            Err(StoreError::Version { .. })
        ));
    }
}
