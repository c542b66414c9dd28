//! Handler traits - 型付き / 型消去されたハンドラ
//!
//! - `Handler<A>`: 利用者向けの型付き API（action 型ごとに 1 impl）
//! - `DynHandler`: registry に格納する object-safe な形
//! - `TypedHandler<A, H>`: `H: Handler<A>` を `DynHandler` に変換するアダプタ

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::action::Action;
use crate::domain::{ActionId, DispatchResult, QueuedAction};

/// decode 済み action と一緒に handler へ渡す配送メタデータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionContext {
    /// Idempotency key. Stable across retries and quarantine round-trips.
    pub id: ActionId,
    /// Attempts so far, including this one.
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl From<&QueuedAction> for ActionContext {
    fn from(action: &QueuedAction) -> Self {
        Self {
            id: action.id(),
            attempts: action.attempts(),
            enqueued_at: action.enqueued_at(),
        }
    }
}

/// 型付き action を 1 件配送し、結果を分類する
///
/// # 分類の目安
/// - `Retryable`: 後で成功しうる失敗（タイムアウト、5xx、レート制限）
/// - `Fatal`: 何度やっても成功しない失敗（バリデーションエラー、4xx）
///
/// エンジン側はドメイン判断をしません。
#[async_trait]
pub trait Handler<A: Action>: Send + Sync {
    async fn handle(&self, action: A, ctx: ActionContext) -> DispatchResult;
}

#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, action: &QueuedAction) -> DispatchResult;

    fn kind(&self) -> &'static str;
}

pub struct TypedHandler<A: Action, H: Handler<A>> {
    handler: H,
    _marker: PhantomData<fn() -> A>,
}

impl<A: Action, H: Handler<A>> TypedHandler<A, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<A: Action, H: Handler<A>> DynHandler for TypedHandler<A, H> {
    async fn handle_dyn(&self, action: &QueuedAction) -> DispatchResult {
        // A payload that does not decode now never will.
        let typed: A = match serde_json::from_value(action.payload().clone()) {
            Ok(typed) => typed,
            Err(e) => return DispatchResult::fatal(format!("payload decode: {e}")),
        };
        self.handler.handle(typed, ActionContext::from(action)).await
    }

    fn kind(&self) -> &'static str {
        A::KIND
    }
}
