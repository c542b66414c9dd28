//! SyncEngineBuilder - エンジンの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - expect_kinds() でアプリが enqueue する action kind を宣言
//! - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足は実行時の quarantine ではなく BuildError になる

use std::sync::Arc;

use super::engine::{EngineParts, SyncEngine};
use crate::config::SyncConfig;
use crate::domain::SyncError;
use crate::impls::{ManualConnectivity, NoopEventSink};
use crate::ports::{
    Clock, ConnectivityMonitor, Dispatcher, EventSink, IdGenerator, QueueStore, SystemClock,
    UlidGenerator,
};
use crate::queue::RetryPolicy;
use crate::typed::{Action, ActionRegistry, Handler, RegistryError};

/// SyncEngineBuilder は SyncEngine を構築
///
/// # 使用例
/// ```ignore
/// let engine = SyncEngineBuilder::new(JsonFileStore::new("queue.json"))
///     .register::<SendMoney, _>(SendMoneyHandler::new(client))?
///     .connectivity(monitor.clone())
///     .config(&config)
///     .expect_kinds(&[SendMoney::KIND])
///     .build()
///     .await?;
/// ```
///
/// # デフォルト
/// - SystemClock / UlidGenerator
/// - 常に online の ManualConnectivity
/// - NoopEventSink
/// - [`RetryPolicy::default`]
pub struct SyncEngineBuilder {
    store: Arc<dyn QueueStore>,
    registry: ActionRegistry,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    connectivity: Option<Arc<dyn ConnectivityMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    events: Option<Arc<dyn EventSink>>,
    policy: RetryPolicy,
    expected_kinds: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing handlers for action kinds: {0:?}. These kinds were expected but not registered.")]
    MissingKinds(Vec<String>),

    #[error("a custom dispatcher was set and handlers were also registered; use one or the other")]
    ConflictingDispatchers,

    #[error("failed to open the queue: {0}")]
    Open(#[from] SyncError),
}

impl SyncEngineBuilder {
    pub fn new<S: QueueStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
            registry: ActionRegistry::new(),
            dispatcher: None,
            connectivity: None,
            clock: None,
            ids: None,
            events: None,
            policy: RetryPolicy::default(),
            expected_kinds: None,
        }
    }

    /// Register a typed handler. Handlers are collected into an
    /// [`ActionRegistry`] that becomes the dispatcher.
    pub fn register<A: Action, H: Handler<A> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<A, H>(handler)?;
        Ok(self)
    }

    /// Use a hand-written dispatcher instead of registered handlers.
    pub fn dispatcher<D: Dispatcher + 'static>(mut self, dispatcher: D) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    pub fn connectivity<M: ConnectivityMonitor + 'static>(mut self, monitor: M) -> Self {
        self.connectivity = Some(Arc::new(monitor));
        self
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn id_generator<G: IdGenerator + 'static>(mut self, ids: G) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    pub fn event_sink<E: EventSink + 'static>(mut self, sink: E) -> Self {
        self.events = Some(Arc::new(sink));
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Take the retry policy from a loaded config.
    pub fn config(self, config: &SyncConfig) -> Self {
        self.retry_policy(config.retry_policy())
    }

    /// Kinds that must have a registered handler. Checked against the
    /// registry only, so this can not be combined with a custom dispatcher.
    pub fn expect_kinds(mut self, kinds: &[&str]) -> Self {
        self.expected_kinds = Some(kinds.iter().map(|k| k.to_string()).collect());
        self
    }

    /// Validate, load the persisted queue, and return an idle engine.
    pub async fn build(self) -> Result<SyncEngine, BuildError> {
        if let Some(expected) = &self.expected_kinds {
            let missing: Vec<String> = expected
                .iter()
                .filter(|kind| !self.registry.contains(kind))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingKinds(missing));
            }
        }

        let dispatcher: Arc<dyn Dispatcher> = match self.dispatcher {
            Some(_) if !self.registry.is_empty() => {
                return Err(BuildError::ConflictingDispatchers);
            }
            Some(custom) => custom,
            None => Arc::new(self.registry),
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())) as Arc<dyn IdGenerator>);

        let parts = EngineParts {
            store: self.store,
            dispatcher,
            connectivity: self
                .connectivity
                .unwrap_or_else(|| Arc::new(ManualConnectivity::online()) as Arc<dyn ConnectivityMonitor>),
            clock,
            ids,
            events: self
                .events
                .unwrap_or_else(|| Arc::new(NoopEventSink) as Arc<dyn EventSink>),
            policy: self.policy,
        };
        Ok(SyncEngine::open(parts).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DispatchResult, StoreError};
    use crate::impls::InMemoryStore;
    use crate::ports::StoreSnapshot;
    use crate::typed::ActionContext;
    use crate::typed::action::fixtures::{SendMoney, UpdateProfile};
    use async_trait::async_trait;

    struct Accept;

    #[async_trait]
    impl Handler<SendMoney> for Accept {
        async fn handle(&self, _action: SendMoney, _ctx: ActionContext) -> DispatchResult {
            DispatchResult::Success
        }
    }

    #[tokio::test]
    async fn build_success() {
        let engine = SyncEngineBuilder::new(InMemoryStore::new())
            .register::<SendMoney, _>(Accept)
            .unwrap()
            .expect_kinds(&[SendMoney::KIND])
            .build()
            .await;
        assert!(engine.is_ok());
    }

    #[tokio::test]
    async fn build_missing_kinds() {
        let result = SyncEngineBuilder::new(InMemoryStore::new())
            .register::<SendMoney, _>(Accept)
            .unwrap()
            .expect_kinds(&[SendMoney::KIND, UpdateProfile::KIND])
            .build()
            .await;
        assert!(matches!(
            result,
            Err(BuildError::MissingKinds(missing)) if missing == vec![UpdateProfile::KIND.to_string()]
        ));
    }

    #[tokio::test]
    async fn custom_dispatcher_conflicts_with_registered_handlers() {
        let result = SyncEngineBuilder::new(InMemoryStore::new())
            .register::<SendMoney, _>(Accept)
            .unwrap()
            .dispatcher(ActionRegistry::new())
            .build()
            .await;
        assert!(matches!(result, Err(BuildError::ConflictingDispatchers)));
    }

    #[tokio::test]
    async fn unreadable_store_fails_build() {
        let snapshot = StoreSnapshot {
            version: crate::ports::SNAPSHOT_VERSION + 1,
            ..StoreSnapshot::default()
        };
        let result = SyncEngineBuilder::new(InMemoryStore::with_snapshot(snapshot))
            .build()
            .await;
        assert!(matches!(
            result,
            Err(BuildError::Open(SyncError::Storage(StoreError::Version { .. })))
        ));
    }

    #[tokio::test]
    async fn config_sets_retry_policy() {
        let config = SyncConfig::from_toml_str("[retry]\nmax_attempts = 2").unwrap();
        let engine = SyncEngineBuilder::new(InMemoryStore::new())
            .config(&config)
            .build()
            .await
            .unwrap();
        assert_eq!(engine.retry_policy().max_attempts, 2);
    }
}
