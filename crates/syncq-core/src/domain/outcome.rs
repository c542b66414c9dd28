//! Dispatch outcomes.
//!
//! The dispatcher owns all knowledge of the remote protocol, including whether
//! an error is worth retrying. The coordinator only routes on this type.

use serde::{Deserialize, Serialize};

/// Result of one delivery attempt.
///
/// Serialized as `{"kind": "RETRYABLE", "reason": "..."}` so it can be logged
/// or recorded next to the action without losing the classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchResult {
    /// The remote accepted the mutation.
    Success,

    /// Transient failure (network, 5xx, throttling). The action stays at the head.
    Retryable(String),

    /// The action can never succeed as constructed (validation, conflict). Quarantine it.
    Fatal(String),
}

impl DispatchResult {
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable(reason.into())
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Retryable(r) | Self::Fatal(r) => Some(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_result_is_tagged() {
        let v = serde_json::to_value(DispatchResult::fatal("conflict")).unwrap();
        assert_eq!(v["kind"], "FATAL");
        assert_eq!(v["reason"], "conflict");

        let v = serde_json::to_value(DispatchResult::Success).unwrap();
        assert_eq!(v["kind"], "SUCCESS");
    }

    #[test]
    fn reason_is_absent_only_on_success() {
        assert_eq!(DispatchResult::Success.reason(), None);
        assert_eq!(DispatchResult::retryable("timeout").reason(), Some("timeout"));
        assert!(!DispatchResult::fatal("x").is_success());
    }
}
