//! Quarantine: actions that failed delivery, kept out of the live queue.
//!
//! Entries are listed oldest failure first. Re-quarantining an id that is
//! already here refreshes its error and timestamp and moves it to the end.

use crate::domain::{ActionId, QuarantinedAction};

use super::seq_map::SeqMap;

#[derive(Debug, Clone, Default)]
pub struct QuarantineStore {
    entries: SeqMap<QuarantinedAction>,
}

impl QuarantineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the replaced entry, if any.
    pub fn insert(&mut self, entry: QuarantinedAction) -> Option<QuarantinedAction> {
        self.entries.push_back(entry)
    }

    pub fn get(&self, id: ActionId) -> Option<&QuarantinedAction> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.entries.contains(id)
    }

    pub fn remove(&mut self, id: ActionId) -> Option<QuarantinedAction> {
        self.entries.remove(id)
    }

    pub fn drain_all(&mut self) -> Vec<QuarantinedAction> {
        self.entries.drain()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuarantinedAction> {
        self.entries.iter()
    }

    pub fn list_all(&self) -> Vec<QuarantinedAction> {
        self.entries.iter().cloned().collect()
    }
}

impl FromIterator<QuarantinedAction> for QuarantineStore {
    fn from_iter<I: IntoIterator<Item = QuarantinedAction>>(iter: I) -> Self {
        let mut store = Self::new();
        for entry in iter {
            store.insert(entry);
        }
        store
    }
}
