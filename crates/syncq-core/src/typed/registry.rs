//! ActionRegistry - kind → handler の対応表、デフォルトの [`Dispatcher`]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::action::Action;
use super::handler::{DynHandler, Handler, TypedHandler};
use crate::domain::{DispatchResult, QueuedAction};
use crate::ports::Dispatcher;

/// 型消去した handler を 1 つの dispatcher にまとめる
///
/// ```ignore
/// let mut registry = ActionRegistry::new();
/// registry.register::<SendMoney, _>(SendMoneyHandler::new(client))?;
/// ```
///
/// 初期化時に構築し、以後は読み取り専用（ロック不要）
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("handler for action kind '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<A: Action, H: Handler<A> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let kind = A::KIND.to_string();
        if self.handlers.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.handlers
            .insert(kind, Arc::new(TypedHandler::<A, H>::new(handler)));
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn registered_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl Dispatcher for ActionRegistry {
    async fn dispatch(&self, action: &QueuedAction) -> DispatchResult {
        let Some(handler) = self.get(action.kind().as_str()) else {
            warn!(action_id = %action.id(), kind = %action.kind(), "no handler registered");
            return DispatchResult::fatal(format!(
                "no handler registered for kind '{}'",
                action.kind()
            ));
        };

        // panic は coordinator 側で捕捉する
        handler.handle_dyn(action).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionId, ActionKind};
    use crate::typed::action::fixtures::{SendMoney, UpdateProfile};
    use crate::typed::handler::ActionContext;
    use chrono::Utc;
    use ulid::Ulid;

    struct Accept;

    #[async_trait]
    impl Handler<SendMoney> for Accept {
        async fn handle(&self, _action: SendMoney, _ctx: ActionContext) -> DispatchResult {
            DispatchResult::Success
        }
    }

    #[async_trait]
    impl Handler<UpdateProfile> for Accept {
        async fn handle(&self, _action: UpdateProfile, _ctx: ActionContext) -> DispatchResult {
            DispatchResult::Success
        }
    }

    fn queued(kind: &str, payload: serde_json::Value) -> QueuedAction {
        QueuedAction::new(
            ActionId::from_ulid(Ulid::new()),
            ActionKind::new(kind),
            payload,
            Utc::now(),
        )
    }

    fn send_money() -> QueuedAction {
        queued(SendMoney::KIND, serde_json::json!({ "to": "bob", "cents": 1 }))
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = ActionRegistry::new();
        registry.register::<SendMoney, _>(Accept).unwrap();
        let result = registry.register::<SendMoney, _>(Accept);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(k)) if k == SendMoney::KIND));
    }

    #[test]
    fn registered_kinds_are_sorted() {
        let mut registry = ActionRegistry::new();
        registry.register::<UpdateProfile, _>(Accept).unwrap();
        registry.register::<SendMoney, _>(Accept).unwrap();
        assert_eq!(
            registry.registered_kinds(),
            vec![SendMoney::KIND.to_string(), UpdateProfile::KIND.to_string()]
        );
        assert_eq!(registry.get(SendMoney::KIND).unwrap().kind(), SendMoney::KIND);
    }

    #[tokio::test]
    async fn dispatch_routes_by_kind() {
        let mut registry = ActionRegistry::new();
        registry.register::<SendMoney, _>(Accept).unwrap();
        assert!(registry.dispatch(&send_money()).await.is_success());
    }

    #[tokio::test]
    async fn unknown_kind_is_fatal() {
        let registry = ActionRegistry::new();
        let result = registry
            .dispatch(&queued("nobody.handles.this", serde_json::json!({})))
            .await;
        assert!(matches!(result, DispatchResult::Fatal(reason) if reason.contains("nobody.handles.this")));
    }
}
