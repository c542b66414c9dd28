//! Queued and quarantined actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::ActionId;

/// Tag identifying the remote operation an action stands for
/// (e.g. `send_money`, `update_profile`). Opaque to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionKind(String);

impl ActionKind {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ActionKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ActionKind {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind + payload pair, the input to batch enqueue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAction {
    pub kind: ActionKind,
    pub payload: serde_json::Value,
}

impl NewAction {
    pub fn new(kind: impl Into<ActionKind>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// One deferred mutation waiting in the live queue.
///
/// Only `attempts` changes after enqueue, and it only grows. The other fields
/// are fixed, which is why they are private with read accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    id: ActionId,
    kind: ActionKind,
    payload: serde_json::Value,
    enqueued_at: DateTime<Utc>,
    attempts: u32,
}

impl QueuedAction {
    pub fn new(
        id: ActionId,
        kind: ActionKind,
        payload: serde_json::Value,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            payload,
            enqueued_at,
            attempts: 0,
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record that a delivery attempt is starting.
    pub(crate) fn record_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Re-queue form used by quarantine retry: same id, kind and payload,
    /// fresh attempt budget, new enqueue time.
    pub(crate) fn requeued(self, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            enqueued_at,
            attempts: 0,
            ..self
        }
    }
}

/// An action that failed delivery and was pulled out of the live queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantinedAction {
    pub action: QueuedAction,
    /// Human-readable reason of the last failure.
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

impl QuarantinedAction {
    pub fn new(action: QueuedAction, error: impl Into<String>, failed_at: DateTime<Utc>) -> Self {
        Self {
            action,
            error: error.into(),
            failed_at,
        }
    }

    pub fn id(&self) -> ActionId {
        self.action.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn sample() -> QueuedAction {
        QueuedAction::new(
            ActionId::from_ulid(Ulid::new()),
            ActionKind::new("send_money"),
            serde_json::json!({"amount": 10}),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn new_action_starts_with_zero_attempts() {
        assert_eq!(sample().attempts(), 0);
    }

    #[test]
    fn record_attempt_only_increases() {
        let mut action = sample();
        assert_eq!(action.record_attempt(), 1);
        assert_eq!(action.record_attempt(), 2);
        assert_eq!(action.attempts(), 2);
    }

    #[test]
    fn requeued_keeps_identity_and_resets_attempts() {
        let mut action = sample();
        action.record_attempt();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let requeued = action.clone().requeued(later);
        assert_eq!(requeued.id(), action.id());
        assert_eq!(requeued.kind(), action.kind());
        assert_eq!(requeued.payload(), action.payload());
        assert_eq!(requeued.attempts(), 0);
        assert_eq!(requeued.enqueued_at(), later);
    }

    #[test]
    fn quarantined_action_json_shape() {
        let q = QuarantinedAction::new(sample(), "rejected", Utc::now());
        let v = serde_json::to_value(&q).unwrap();
        assert_eq!(v["action"]["kind"], "send_money");
        assert_eq!(v["error"], "rejected");
    }
}
