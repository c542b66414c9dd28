//! Domain events emitted to an [`EventSink`](crate::ports::EventSink).
//!
//! Events are observation only. Nothing in the engine reads them back.

use serde::{Deserialize, Serialize};

use super::action::ActionKind;
use super::ids::{ActionId, RunId};
use super::report::RunFailure;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Enqueued {
        action_id: ActionId,
        kind: ActionKind,
        pending: usize,
    },
    RunStarted {
        run_id: RunId,
        pending: usize,
    },
    DispatchStarted {
        run_id: RunId,
        action_id: ActionId,
        attempt: u32,
    },
    Delivered {
        run_id: RunId,
        action_id: ActionId,
        attempts: u32,
    },
    RetryScheduled {
        run_id: RunId,
        action_id: ActionId,
        attempt: u32,
        delay_ms: u64,
        reason: String,
    },
    Quarantined {
        action_id: ActionId,
        reason: String,
    },
    Retried {
        action_id: ActionId,
    },
    Discarded {
        action_id: ActionId,
    },
    /// The whole queue was cleared (e.g. on logout).
    Drained {
        count: usize,
    },
    RunFinished {
        run_id: RunId,
        delivered: usize,
        quarantined: usize,
        failure: Option<RunFailure>,
    },
}

impl SyncEvent {
    pub fn action_id(&self) -> Option<ActionId> {
        match self {
            SyncEvent::Enqueued { action_id, .. }
            | SyncEvent::DispatchStarted { action_id, .. }
            | SyncEvent::Delivered { action_id, .. }
            | SyncEvent::RetryScheduled { action_id, .. }
            | SyncEvent::Quarantined { action_id, .. }
            | SyncEvent::Retried { action_id }
            | SyncEvent::Discarded { action_id } => Some(*action_id),
            SyncEvent::RunStarted { .. } | SyncEvent::Drained { .. } | SyncEvent::RunFinished { .. } => {
                None
            }
        }
    }
}
