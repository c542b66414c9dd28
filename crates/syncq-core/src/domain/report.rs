//! Per-run summary returned by the coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ActionId, RunId};
use super::state::{CONNECTIVITY_LOST, RunOutcome};

/// Why a run stopped before the queue was empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RunFailure {
    /// Connectivity dropped. Nothing was lost; the next `online` resumes.
    ConnectivityLost,

    /// Persisting an intermediate step failed. The queue on disk is the state
    /// before that step.
    Storage(String),

    /// The worker was shut down mid-run.
    Shutdown,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFailure::ConnectivityLost => f.write_str(CONNECTIVITY_LOST),
            RunFailure::Storage(e) => write!(f, "storage_error: {e}"),
            RunFailure::Shutdown => f.write_str("shutdown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Delivered actions, in dispatch order.
    pub delivered: Vec<ActionId>,
    /// Actions moved to quarantine during this run, in order.
    pub quarantined: Vec<ActionId>,
    /// Retryable failures that were retried in place.
    pub retries: u32,
    /// Total dispatch calls made.
    pub dispatches: u32,
    pub failure: Option<RunFailure>,
}

impl RunReport {
    pub(crate) fn new(run_id: RunId, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            delivered: Vec::new(),
            quarantined: Vec::new(),
            retries: 0,
            dispatches: 0,
            failure: None,
        }
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.failure.is_some() {
            RunOutcome::Failed
        } else {
            RunOutcome::Completed
        }
    }

    pub fn processed(&self) -> usize {
        self.delivered.len() + self.quarantined.len()
    }
}
