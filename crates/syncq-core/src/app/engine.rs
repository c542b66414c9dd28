//! SyncEngine - キューと quarantine の API、coordinator が駆動する状態
//!
//! # 書き込みフロー
//! すべての変更は 1 つの async ロックの下で同じ手順を踏みます：
//! 1. ledger を clone
//! 2. clone に変更を適用
//! 3. `store.save(clone)`
//! 4. `Ok` なら clone を差し替え、pending 数を公開し、イベントを emit
//!
//! save が失敗すると `SyncError::Storage` を返し、ledger は呼び出し前のまま。
//! 永続化されていない状態が読み手に見えることはありません。

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, warn};

use super::status::QueueStats;
use crate::domain::{
    ActionId, ActionKind, NewAction, QuarantinedAction, QueuedAction, SyncError, SyncEvent,
    SyncStatus,
};
use crate::ports::{Clock, ConnectivityMonitor, Dispatcher, EventSink, IdGenerator, QueueStore};
use crate::queue::{Ledger, RetryPolicy};
use crate::typed::Action;

/// エンジンの依存一式（[`SyncEngineBuilder`](super::SyncEngineBuilder) が組み立てる）
pub(crate) struct EngineParts {
    pub store: Arc<dyn QueueStore>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub connectivity: Arc<dyn ConnectivityMonitor>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub events: Arc<dyn EventSink>,
    pub policy: RetryPolicy,
}

pub(crate) struct Inner {
    pub(crate) ledger: Mutex<Ledger>,
    pub(crate) store: Arc<dyn QueueStore>,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    pub(crate) connectivity: Arc<dyn ConnectivityMonitor>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) policy: RetryPolicy,
    pub(crate) status_tx: watch::Sender<SyncStatus>,
    pub(crate) pending_tx: watch::Sender<usize>,
}

/// オフライン mutation キュー + 同期 coordinator
///
/// clone は安価で、すべての clone が同じキューを共有します。
#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) inner: Arc<Inner>,
}

impl SyncEngine {
    /// Load the persisted snapshot and start in `Idle`.
    pub(crate) async fn open(parts: EngineParts) -> Result<Self, SyncError> {
        let snapshot = parts.store.load().await?;
        let ledger = Ledger::from_snapshot(snapshot);
        info!(
            pending = ledger.pending(),
            quarantined = ledger.quarantine.len(),
            "sync engine opened"
        );

        let (status_tx, _) = watch::channel(SyncStatus::idle());
        let (pending_tx, _) = watch::channel(ledger.pending());

        Ok(Self {
            inner: Arc::new(Inner {
                ledger: Mutex::new(ledger),
                store: parts.store,
                dispatcher: parts.dispatcher,
                connectivity: parts.connectivity,
                clock: parts.clock,
                ids: parts.ids,
                events: parts.events,
                policy: parts.policy,
                status_tx,
                pending_tx,
            }),
        })
    }

    // ------------------------------------------------------------------
    // Mutation queue
    // ------------------------------------------------------------------

    /// Append one action at the tail and persist. Returns its id.
    pub async fn enqueue(
        &self,
        kind: impl Into<ActionKind>,
        payload: serde_json::Value,
    ) -> Result<ActionId, SyncError> {
        let id = self.inner.ids.action_id();
        self.append(vec![(id, NewAction::new(kind, payload))]).await?;
        Ok(id)
    }

    /// Encode a typed action and enqueue it.
    pub async fn enqueue_action<A: Action>(&self, action: &A) -> Result<ActionId, SyncError> {
        let new = NewAction::from_action(action)?;
        self.enqueue(new.kind, new.payload).await
    }

    /// Append several actions in order with a single save. Either all of them
    /// are queued or none is.
    pub async fn batch_enqueue(&self, actions: Vec<NewAction>) -> Result<Vec<ActionId>, SyncError> {
        let batch: Vec<(ActionId, NewAction)> = actions
            .into_iter()
            .map(|new| (self.inner.ids.action_id(), new))
            .collect();
        let ids = batch.iter().map(|(id, _)| *id).collect();
        self.append(batch).await?;
        Ok(ids)
    }

    async fn append(&self, batch: Vec<(ActionId, NewAction)>) -> Result<(), SyncError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut ledger = self.lock().await;
        let mut next = ledger.clone();
        let now = self.inner.clock.now();
        let mut added = Vec::with_capacity(batch.len());
        for (id, NewAction { kind, payload }) in batch {
            next.queue
                .push_back(QueuedAction::new(id, kind.clone(), payload, now));
            added.push((id, kind));
        }
        self.persist(&mut ledger, next).await?;

        let pending = ledger.pending();
        for (action_id, kind) in added {
            debug!(%action_id, %kind, pending, "action enqueued");
            self.emit(SyncEvent::Enqueued {
                action_id,
                kind,
                pending,
            });
        }
        Ok(())
    }

    pub async fn peek_head(&self) -> Option<QueuedAction> {
        self.lock().await.queue.peek_head().cloned()
    }

    /// Snapshot of the live queue in dispatch order.
    pub async fn queued(&self) -> Vec<QueuedAction> {
        self.lock().await.queued()
    }

    /// Remove a queued action. Idempotent: an absent id is a no-op that
    /// returns `Ok(false)` and does not touch the store.
    pub async fn remove_by_id(&self, id: ActionId) -> Result<bool, SyncError> {
        let mut ledger = self.lock().await;
        if !ledger.queue.contains(id) {
            return Ok(false);
        }
        let mut next = ledger.clone();
        next.queue.remove_by_id(id);
        self.persist(&mut ledger, next).await?;
        debug!(action_id = %id, "action removed");
        Ok(true)
    }

    /// Empty the live queue and return what was in it (logout, full reset).
    /// Quarantine is left alone; see [`clear_quarantine`](Self::clear_quarantine).
    pub async fn drain_all(&self) -> Result<Vec<QueuedAction>, SyncError> {
        let mut ledger = self.lock().await;
        if ledger.queue.is_empty() {
            return Ok(Vec::new());
        }
        let mut next = ledger.clone();
        let drained = next.queue.drain_all();
        self.persist(&mut ledger, next).await?;

        info!(count = drained.len(), "queue drained");
        self.emit(SyncEvent::Drained {
            count: drained.len(),
        });
        Ok(drained)
    }

    // ------------------------------------------------------------------
    // Quarantine
    // ------------------------------------------------------------------

    /// Move `action` into quarantine with `error`, removing it from the live
    /// queue. Quarantining an id that is already quarantined refreshes its
    /// error and timestamp.
    pub async fn quarantine(
        &self,
        action: QueuedAction,
        error: impl Into<String>,
    ) -> Result<(), SyncError> {
        let mut ledger = self.lock().await;
        self.quarantine_locked(&mut ledger, action, error.into())
            .await
    }

    /// Put a quarantined action back at the tail of the live queue with a
    /// fresh attempt budget. The id is kept, so the remote side still sees
    /// the same idempotency key.
    pub async fn retry(&self, id: ActionId) -> Result<ActionId, SyncError> {
        let mut ledger = self.lock().await;
        if !ledger.quarantine.contains(id) {
            return Err(SyncError::NotFound(id));
        }
        let mut next = ledger.clone();
        let now = self.inner.clock.now();
        if let Some(entry) = next.quarantine.remove(id) {
            next.queue.push_back(entry.action.requeued(now));
        }
        self.persist(&mut ledger, next).await?;

        info!(action_id = %id, "quarantined action re-queued");
        self.emit(SyncEvent::Retried { action_id: id });
        Ok(id)
    }

    /// Drop a quarantined action for good.
    pub async fn discard(&self, id: ActionId) -> Result<QuarantinedAction, SyncError> {
        let mut ledger = self.lock().await;
        let mut next = ledger.clone();
        let entry = next.quarantine.remove(id).ok_or(SyncError::NotFound(id))?;
        self.persist(&mut ledger, next).await?;

        info!(action_id = %id, kind = %entry.action.kind(), "quarantined action discarded");
        self.emit(SyncEvent::Discarded { action_id: id });
        Ok(entry)
    }

    /// Quarantined actions, oldest failure first.
    pub async fn list_quarantined(&self) -> Vec<QuarantinedAction> {
        self.lock().await.quarantine.list_all()
    }

    /// Re-queue every quarantined action, in quarantine order, with one save.
    pub async fn retry_all_quarantined(&self) -> Result<Vec<ActionId>, SyncError> {
        let mut ledger = self.lock().await;
        if ledger.quarantine.is_empty() {
            return Ok(Vec::new());
        }
        let mut next = ledger.clone();
        let now = self.inner.clock.now();
        let mut ids = Vec::with_capacity(next.quarantine.len());
        for entry in next.quarantine.drain_all() {
            ids.push(entry.id());
            next.queue.push_back(entry.action.requeued(now));
        }
        self.persist(&mut ledger, next).await?;

        info!(count = ids.len(), "all quarantined actions re-queued");
        for id in &ids {
            self.emit(SyncEvent::Retried { action_id: *id });
        }
        Ok(ids)
    }

    /// Discard every quarantined action.
    pub async fn clear_quarantine(&self) -> Result<Vec<QuarantinedAction>, SyncError> {
        let mut ledger = self.lock().await;
        if ledger.quarantine.is_empty() {
            return Ok(Vec::new());
        }
        let mut next = ledger.clone();
        let cleared = next.quarantine.drain_all();
        self.persist(&mut ledger, next).await?;

        info!(count = cleared.len(), "quarantine cleared");
        for entry in &cleared {
            self.emit(SyncEvent::Discarded {
                action_id: entry.id(),
            });
        }
        Ok(cleared)
    }

    // ------------------------------------------------------------------
    // Observed state
    // ------------------------------------------------------------------

    /// Always equal to the live queue length after the last committed mutation.
    pub fn pending_count(&self) -> usize {
        *self.inner.pending_tx.borrow()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<usize> {
        self.inner.pending_tx.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status_tx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status_tx.subscribe()
    }

    pub async fn stats(&self) -> QueueStats {
        QueueStats::from_ledger(&*self.lock().await)
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    pub fn is_online(&self) -> bool {
        self.inner.connectivity.subscribe().borrow().is_online()
    }

    // ------------------------------------------------------------------
    // Internals shared with the coordinator
    // ------------------------------------------------------------------

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.ledger.lock().await
    }

    /// Save `next`, then make it the live ledger.
    pub(crate) async fn persist(
        &self,
        current: &mut MutexGuard<'_, Ledger>,
        next: Ledger,
    ) -> Result<(), SyncError> {
        if let Err(e) = self.inner.store.save(&next.snapshot()).await {
            warn!(error = %e, "persisting queue failed, change rolled back");
            return Err(e.into());
        }
        **current = next;
        let pending = current.pending();
        self.inner.pending_tx.send_if_modified(|count| {
            let changed = *count != pending;
            *count = pending;
            changed
        });
        Ok(())
    }

    pub(crate) async fn quarantine_locked(
        &self,
        ledger: &mut MutexGuard<'_, Ledger>,
        action: QueuedAction,
        error: String,
    ) -> Result<(), SyncError> {
        let id = action.id();
        let kind = action.kind().clone();
        let attempts = action.attempts();
        let mut next = (**ledger).clone();
        next.quarantine(QuarantinedAction::new(action, error.clone(), self.inner.clock.now()));
        self.persist(ledger, next).await?;

        warn!(action_id = %id, %kind, attempts, reason = %error, "action quarantined");
        self.emit(SyncEvent::Quarantined {
            action_id: id,
            reason: error,
        });
        Ok(())
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        self.inner.events.emit(&event);
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("pending", &self.pending_count())
            .field("status", &self.inner.status_tx.borrow().state)
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}
