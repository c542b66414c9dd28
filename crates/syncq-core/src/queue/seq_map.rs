//! Insertion-ordered map keyed by [`ActionId`].
//!
//! Design:
//! - `entries` is ordered by a private sequence number assigned on insert.
//! - `index` maps each id to its sequence number.
//! - Invariant: `index` and `entries` always hold the same set of ids.
//!
//! Removing from the middle never shifts other entries, so a removal that
//! races with an append can not hit the wrong element.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{ActionId, QuarantinedAction, QueuedAction};

pub(crate) trait Keyed {
    fn key(&self) -> ActionId;
}

impl Keyed for QueuedAction {
    fn key(&self) -> ActionId {
        self.id()
    }
}

impl Keyed for QuarantinedAction {
    fn key(&self) -> ActionId {
        self.id()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SeqMap<V> {
    entries: BTreeMap<u64, V>,
    index: HashMap<ActionId, u64>,
    next_seq: u64,
}

impl<V> Default for SeqMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<V: Keyed> SeqMap<V> {
    /// Append at the tail. If the id is already present, the old entry is
    /// removed first, so the value always ends up last.
    pub(crate) fn push_back(&mut self, value: V) -> Option<V> {
        let previous = self.remove(value.key());
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(value.key(), seq);
        self.entries.insert(seq, value);
        previous
    }

    pub(crate) fn front(&self) -> Option<&V> {
        self.entries.values().next()
    }

    pub(crate) fn get(&self, id: ActionId) -> Option<&V> {
        let seq = self.index.get(&id)?;
        self.entries.get(seq)
    }

    pub(crate) fn get_mut(&mut self, id: ActionId) -> Option<&mut V> {
        let seq = self.index.get(&id)?;
        self.entries.get_mut(seq)
    }

    pub(crate) fn contains(&self, id: ActionId) -> bool {
        self.index.contains_key(&id)
    }

    pub(crate) fn remove(&mut self, id: ActionId) -> Option<V> {
        let seq = self.index.remove(&id)?;
        self.entries.remove(&seq)
    }

    /// Remove everything, returning values in order.
    pub(crate) fn drain(&mut self) -> Vec<V> {
        self.index.clear();
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionKind;
    use chrono::Utc;
    use ulid::Ulid;

    fn action() -> QueuedAction {
        QueuedAction::new(
            ActionId::from_ulid(Ulid::new()),
            ActionKind::new("k"),
            serde_json::json!(null),
            Utc::now(),
        )
    }

    #[test]
    fn keeps_insertion_order_across_removals() {
        let mut map = SeqMap::default();
        let (a, b, c) = (action(), action(), action());
        let (ia, ib, ic) = (a.id(), b.id(), c.id());
        map.push_back(a);
        map.push_back(b);
        map.push_back(c);

        map.remove(ib);
        let ids: Vec<_> = map.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![ia, ic]);
        assert_eq!(map.front().map(|v| v.id()), Some(ia));
    }

    #[test]
    fn push_back_of_existing_id_moves_it_to_tail() {
        let mut map = SeqMap::default();
        let (a, b) = (action(), action());
        let (ia, ib) = (a.id(), b.id());
        map.push_back(a.clone());
        map.push_back(b);

        let previous = map.push_back(a);
        assert!(previous.is_some());
        assert_eq!(map.len(), 2);
        let ids: Vec<_> = map.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![ib, ia]);
    }

    #[test]
    fn drain_empties_index_too() {
        let mut map = SeqMap::default();
        let a = action();
        let ia = a.id();
        map.push_back(a);

        assert_eq!(map.drain().len(), 1);
        assert!(map.is_empty());
        assert!(!map.contains(ia));
        assert!(map.get(ia).is_none());
    }
}
