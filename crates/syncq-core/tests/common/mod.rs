#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use syncq_core::domain::{ActionId, DispatchResult, QueuedAction};
use syncq_core::impls::{InMemoryStore, ManualConnectivity};
use syncq_core::ports::Dispatcher;
use syncq_core::{RetryPolicy, SyncEngine, SyncEngineBuilder};
use tokio::sync::Notify;

/// One observed dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub id: ActionId,
    pub kind: String,
    pub attempts: u32,
}

/// Dispatcher that answers from a per-kind script and succeeds once the
/// script runs out.
#[derive(Default)]
pub struct Scripted {
    script: Mutex<HashMap<String, VecDeque<DispatchResult>>>,
    calls: Mutex<Vec<Call>>,
    offline_after: Mutex<Option<(String, Arc<ManualConnectivity>)>>,
}

impl Scripted {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, kind: &str, results: impl IntoIterator<Item = DispatchResult>) {
        self.script
            .lock()
            .unwrap()
            .entry(kind.to_string())
            .or_default()
            .extend(results);
    }

    /// Flip `monitor` offline right after `kind` is dispatched.
    pub fn go_offline_after(&self, kind: &str, monitor: Arc<ManualConnectivity>) {
        *self.offline_after.lock().unwrap() = Some((kind.to_string(), monitor));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.kind).collect()
    }
}

#[async_trait]
impl Dispatcher for Scripted {
    async fn dispatch(&self, action: &QueuedAction) -> DispatchResult {
        let kind = action.kind().as_str().to_string();
        self.calls.lock().unwrap().push(Call {
            id: action.id(),
            kind: kind.clone(),
            attempts: action.attempts(),
        });
        if let Some((trigger, monitor)) = self.offline_after.lock().unwrap().as_ref()
            && *trigger == kind
        {
            monitor.set_offline();
        }
        self.script
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .unwrap_or(DispatchResult::Success)
    }
}

/// Dispatcher that blocks every call until released.
#[derive(Default)]
pub struct Gated {
    pub release: Notify,
    pub calls: Mutex<Vec<ActionId>>,
}

#[async_trait]
impl Dispatcher for Gated {
    async fn dispatch(&self, action: &QueuedAction) -> DispatchResult {
        self.calls.lock().unwrap().push(action.id());
        self.release.notified().await;
        DispatchResult::Success
    }
}

pub struct Harness {
    pub engine: SyncEngine,
    pub store: Arc<InMemoryStore>,
    pub monitor: Arc<ManualConnectivity>,
    pub dispatcher: Arc<Scripted>,
}

pub async fn harness(policy: RetryPolicy) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let monitor = Arc::new(ManualConnectivity::online());
    let dispatcher = Scripted::new();
    let engine = SyncEngineBuilder::new(store.clone())
        .dispatcher(dispatcher.clone())
        .connectivity(monitor.clone())
        .retry_policy(policy)
        .build()
        .await
        .unwrap();
    Harness {
        engine,
        store,
        monitor,
        dispatcher,
    }
}
