//! Ledger: the queue and the quarantine as one unit of state.
//!
//! Every engine mutation works on a copy of the ledger, persists the copy,
//! and swaps it in only after the save succeeded. An action therefore lives
//! in at most one of the two structures in every published state.

use crate::domain::{QuarantinedAction, QueuedAction};
use crate::ports::StoreSnapshot;

use super::{MutationQueue, QuarantineStore};

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub queue: MutationQueue,
    pub quarantine: QuarantineStore,
}

impl Ledger {
    /// Rebuild from a persisted snapshot. If an id shows up in both lists
    /// (a snapshot from an older, buggy writer), the quarantine entry wins.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let quarantine: QuarantineStore = snapshot.quarantine.into_iter().collect();
        let queue: MutationQueue = snapshot
            .queue
            .into_iter()
            .filter(|a| !quarantine.contains(a.id()))
            .collect();
        Self { queue, quarantine }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::new(
            self.queue.iter().cloned().collect(),
            self.quarantine.list_all(),
        )
    }

    /// Move an action into quarantine, taking it out of the live queue.
    pub fn quarantine(&mut self, entry: QuarantinedAction) {
        self.queue.remove_by_id(entry.id());
        self.quarantine.insert(entry);
    }

    /// Pending-change count. Always derived, never stored.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn queued(&self) -> Vec<QueuedAction> {
        self.queue.iter().cloned().collect()
    }
}
