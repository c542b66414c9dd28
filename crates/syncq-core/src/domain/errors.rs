//! Error types - エラー型の定義
//!
//! # 方針
//! - dispatch の失敗はエラーではない（[`DispatchResult`](super::DispatchResult) として
//!   扱い、drain ループの外に出ない）
//! - run の中断（接続断、run 中の永続化失敗）は run report の
//!   [`RunFailure`](super::RunFailure) で報告する

use thiserror::Error;

use super::ids::ActionId;

/// [`QueueStore`](crate::ports::QueueStore) が報告する永続化エラー
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("{0}")]
    Other(String),
}

/// エンジン操作が返すエラー
#[derive(Debug, Error)]
pub enum SyncError {
    /// Persisting the new state failed; the in-memory state was left unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Retry/discard against an id that is not quarantined.
    #[error("action {0} not found")]
    NotFound(ActionId),

    /// A typed action could not be encoded into a payload.
    #[error("payload encoding failed: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn not_found_mentions_the_id() {
        let id = ActionId::from_ulid(Ulid::new());
        let msg = SyncError::NotFound(id).to_string();
        assert!(msg.contains(&id.to_string()));
    }

    #[test]
    fn store_error_converts_into_sync_error() {
        let err: SyncError = StoreError::Other("disk full".to_string()).into();
        assert!(matches!(err, SyncError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
