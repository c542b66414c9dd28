//! QueueStats - キューの集計（ある時点のスナップショット）

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::queue::Ledger;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Actions waiting in the live queue.
    pub pending: usize,
    /// Actions parked in quarantine.
    pub quarantined: usize,
    /// Enqueue time of the oldest pending action.
    pub oldest_pending: Option<DateTime<Utc>>,
    /// Pending actions that have been attempted at least once.
    pub pending_retried: usize,
    /// Pending count per action kind.
    pub pending_by_kind: BTreeMap<String, usize>,
}

impl QueueStats {
    pub(crate) fn from_ledger(ledger: &Ledger) -> Self {
        let mut stats = QueueStats {
            pending: ledger.queue.len(),
            quarantined: ledger.quarantine.len(),
            ..QueueStats::default()
        };
        for action in ledger.queue.iter() {
            stats.oldest_pending = Some(match stats.oldest_pending {
                Some(oldest) => oldest.min(action.enqueued_at()),
                None => action.enqueued_at(),
            });
            if action.attempts() > 0 {
                stats.pending_retried += 1;
            }
            *stats
                .pending_by_kind
                .entry(action.kind().to_string())
                .or_default() += 1;
        }
        stats
    }

    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.quarantined == 0
    }
}
