//! InMemoryStore: a [`QueueStore`] for tests and ephemeral sessions.
//!
//! Saves can be made to fail on demand, which is how the engine's
//! "storage error leaves state unchanged" path is exercised.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::StoreError;
use crate::ports::{QueueStore, StoreSnapshot};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    snapshot: Mutex<StoreSnapshot>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, as if loaded from disk.
    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// While set, every `save` returns an error and keeps the last good snapshot.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Last successfully saved snapshot.
    pub fn saved(&self) -> StoreSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn load(&self) -> Result<StoreSnapshot, StoreError> {
        let snapshot = self.saved();
        snapshot.check_version()?;
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Other("injected save failure".to_string()));
        }
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = snapshot.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
