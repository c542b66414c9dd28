//! The live mutation queue: FIFO by enqueue, drained from the head.

use crate::domain::{ActionId, QueuedAction};

use super::seq_map::SeqMap;

#[derive(Debug, Clone, Default)]
pub struct MutationQueue {
    actions: SeqMap<QueuedAction>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail.
    pub fn push_back(&mut self, action: QueuedAction) {
        self.actions.push_back(action);
    }

    pub fn peek_head(&self) -> Option<&QueuedAction> {
        self.actions.front()
    }

    pub fn get(&self, id: ActionId) -> Option<&QueuedAction> {
        self.actions.get(id)
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.actions.contains(id)
    }

    /// Idempotent: removing an absent id is a no-op returning `None`.
    pub fn remove_by_id(&mut self, id: ActionId) -> Option<QueuedAction> {
        self.actions.remove(id)
    }

    /// Increment `attempts` in place. Returns the new count, or `None` if the
    /// action is no longer queued.
    pub fn record_attempt(&mut self, id: ActionId) -> Option<u32> {
        self.actions.get_mut(id).map(QueuedAction::record_attempt)
    }

    pub fn drain_all(&mut self) -> Vec<QueuedAction> {
        self.actions.drain()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedAction> {
        self.actions.iter()
    }
}

impl FromIterator<QueuedAction> for MutationQueue {
    fn from_iter<I: IntoIterator<Item = QueuedAction>>(iter: I) -> Self {
        let mut queue = Self::new();
        for action in iter {
            queue.push_back(action);
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionKind;
    use chrono::Utc;
    use ulid::Ulid;

    fn action(kind: &str) -> QueuedAction {
        QueuedAction::new(
            ActionId::from_ulid(Ulid::new()),
            ActionKind::new(kind),
            serde_json::json!({}),
            Utc::now(),
        )
    }

    #[test]
    fn head_is_first_enqueued() {
        let queue: MutationQueue = [action("a"), action("b")].into_iter().collect();
        assert_eq!(queue.peek_head().unwrap().kind().as_str(), "a");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn remove_by_id_twice_is_same_as_once() {
        let a = action("a");
        let id = a.id();
        let mut queue: MutationQueue = [a, action("b")].into_iter().collect();

        assert!(queue.remove_by_id(id).is_some());
        let after_once: Vec<_> = queue.iter().cloned().collect();
        assert!(queue.remove_by_id(id).is_none());
        let after_twice: Vec<_> = queue.iter().cloned().collect();

        assert_eq!(after_once, after_twice);
    }

    #[test]
    fn record_attempt_mutates_in_place() {
        let a = action("a");
        let id = a.id();
        let mut queue: MutationQueue = [a].into_iter().collect();

        assert_eq!(queue.record_attempt(id), Some(1));
        assert_eq!(queue.record_attempt(id), Some(2));
        assert_eq!(queue.peek_head().unwrap().attempts(), 2);

        queue.remove_by_id(id);
        assert_eq!(queue.record_attempt(id), None);
    }

    #[test]
    fn drain_all_returns_fifo_and_clears() {
        let (a, b) = (action("a"), action("b"));
        let ids = vec![a.id(), b.id()];
        let mut queue: MutationQueue = [a, b].into_iter().collect();

        let drained: Vec<_> = queue.drain_all().iter().map(|a| a.id()).collect();
        assert_eq!(drained, ids);
        assert!(queue.is_empty());
    }
}
