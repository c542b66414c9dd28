//! Dispatcher port - action をリモート（正本）へ配送
//!
//! アプリケーション側が実装します。通常は
//! [`ActionRegistry`](crate::typed::ActionRegistry) 経由です。
//!
//! # 設計原則
//! - 失敗が retryable か fatal かを決めるのは dispatcher
//! - coordinator はドメインロジックを持たない

use async_trait::async_trait;

use crate::domain::{DispatchResult, QueuedAction};

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// `action` を配送する。
    ///
    /// - `action.id()` は冪等キー
    /// - `action.attempts()` は今回の試行を含む
    /// - 接続断で future が drop されることがある（retryable 扱い）
    async fn dispatch(&self, action: &QueuedAction) -> DispatchResult;
}

#[async_trait]
impl<D: Dispatcher + ?Sized> Dispatcher for std::sync::Arc<D> {
    async fn dispatch(&self, action: &QueuedAction) -> DispatchResult {
        (**self).dispatch(action).await
    }
}
