//! Sync coordinator の状態機械

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ActionId, RunId};

/// Coordinator の状態
///
/// # 状態遷移
/// - Idle -> Syncing -> Completed -> Idle（キューが空になった。すぐ Idle に戻る）
/// - Idle -> Syncing -> Failed（run 中断。次のトリガーまで表示し続ける）
/// - Failed -> Syncing（新しいトリガーで run をやり直す）
///
/// トリガーを拒否するのは `Syncing` だけ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Syncing,
    Completed,
    Failed,
}

impl SyncState {
    /// Can a new run start from this state?
    pub fn accepts_trigger(self) -> bool {
        !matches!(self, SyncState::Syncing)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// 直近の run の終わり方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed,
}

/// 現在（または直近）の run の進捗
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Actions that left the queue during this run (delivered or quarantined).
    pub processed: usize,
    /// Actions still queued.
    pub remaining: usize,
}

impl Progress {
    /// Fraction processed in `[0.0, 1.0]`. An empty run counts as done.
    pub fn fraction(&self) -> f64 {
        let total = self.processed + self.remaining;
        if total == 0 {
            1.0
        } else {
            self.processed as f64 / total as f64
        }
    }
}

/// run 中に接続が切れたときに記録するエラー文字列
pub const CONNECTIVITY_LOST: &str = "connectivity_lost";

/// 観測者に公開する coordinator の読み取り専用スナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub run_id: Option<RunId>,
    pub progress: Progress,
    /// Action currently in flight. Only set while `Syncing`.
    pub current_action: Option<ActionId>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub last_outcome: Option<RunOutcome>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::idle()
    }
}

impl SyncStatus {
    pub fn idle() -> Self {
        Self {
            state: SyncState::Idle,
            run_id: None,
            progress: Progress::default(),
            current_action: None,
            started_at: None,
            completed_at: None,
            error: None,
            last_outcome: None,
        }
    }

    /// Enter `Syncing`. Returns false (and changes nothing) if a run is active.
    pub(crate) fn try_begin(&mut self, run_id: RunId, remaining: usize, now: DateTime<Utc>) -> bool {
        if !self.state.accepts_trigger() {
            return false;
        }
        self.state = SyncState::Syncing;
        self.run_id = Some(run_id);
        self.progress = Progress {
            processed: 0,
            remaining,
        };
        self.current_action = None;
        self.started_at = Some(now);
        self.error = None;
        true
    }

    pub(crate) fn set_in_flight(&mut self, action: Option<ActionId>, remaining: usize) {
        self.current_action = action;
        self.progress.remaining = remaining;
    }

    pub(crate) fn advance(&mut self, remaining: usize) {
        self.progress.processed += 1;
        self.progress.remaining = remaining;
        self.current_action = None;
    }

    /// Queue drained.
    pub(crate) fn complete(&mut self, now: DateTime<Utc>) {
        self.state = SyncState::Completed;
        self.current_action = None;
        self.completed_at = Some(now);
        self.error = None;
        self.last_outcome = Some(RunOutcome::Completed);
    }

    /// `Completed -> Idle`. Completion details stay readable.
    pub(crate) fn settle(&mut self) {
        if self.state == SyncState::Completed {
            self.state = SyncState::Idle;
        }
    }

    pub(crate) fn fail(&mut self, error: impl Into<String>, remaining: usize) {
        self.state = SyncState::Failed;
        self.current_action = None;
        self.progress.remaining = remaining;
        self.error = Some(error.into());
        self.last_outcome = Some(RunOutcome::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    #[rstest]
    #[case::idle(SyncState::Idle, true)]
    #[case::syncing(SyncState::Syncing, false)]
    #[case::completed(SyncState::Completed, true)]
    #[case::failed(SyncState::Failed, true)]
    fn only_syncing_rejects_triggers(#[case] state: SyncState, #[case] accepts: bool) {
        assert_eq!(state.accepts_trigger(), accepts);
    }

    #[test]
    fn begin_is_rejected_while_syncing() {
        let mut status = SyncStatus::idle();
        let now = Utc::now();
        assert!(status.try_begin(RunId::from_ulid(Ulid::new()), 3, now));
        let first_run = status.run_id;

        assert!(!status.try_begin(RunId::from_ulid(Ulid::new()), 3, now));
        assert_eq!(status.run_id, first_run);
        assert_eq!(status.state, SyncState::Syncing);
    }

    #[test]
    fn complete_falls_back_to_idle_and_keeps_outcome() {
        let mut status = SyncStatus::idle();
        let now = Utc::now();
        status.try_begin(RunId::from_ulid(Ulid::new()), 1, now);
        status.advance(0);
        status.complete(now);
        assert_eq!(status.state, SyncState::Completed);

        status.settle();
        assert_eq!(status.state, SyncState::Idle);
        assert_eq!(status.last_outcome, Some(RunOutcome::Completed));
        assert_eq!(status.completed_at, Some(now));
        assert_eq!(status.progress.processed, 1);
    }

    #[test]
    fn failed_run_can_be_restarted() {
        let mut status = SyncStatus::idle();
        let now = Utc::now();
        status.try_begin(RunId::from_ulid(Ulid::new()), 2, now);
        status.fail(CONNECTIVITY_LOST, 2);
        assert_eq!(status.state, SyncState::Failed);
        assert_eq!(status.error.as_deref(), Some(CONNECTIVITY_LOST));

        assert!(status.try_begin(RunId::from_ulid(Ulid::new()), 2, now));
        assert_eq!(status.error, None);
    }

    #[test]
    fn progress_fraction() {
        let p = Progress {
            processed: 1,
            remaining: 3,
        };
        assert_eq!(p.fraction(), 0.25);
        assert_eq!(Progress::default().fraction(), 1.0);
    }
}
