//! Sync coordinator - drain ループ
//!
//! # フロー
//! 1. `Idle | Completed | Failed -> Syncing`（`Syncing` 中なら拒否）
//! 2. キューが空でなく online の間:
//!    - 先頭の `attempts` を増やして永続化
//!    - 接続断と競合させながら dispatch
//!    - `Success` → 先頭を削除
//!    - `Retryable`（予算内）→ backoff して同じ action を再試行
//!    - `Fatal` または予算切れの `Retryable` → quarantine
//! 3. キューが空なら `Completed -> Idle`、そうでなければ `Failed`
//!
//! # 設計原則
//! - `Syncing` 状態がそのまま実行ロック（dispatch は常に 1 件だけ）
//! - dispatcher の panic は retryable として扱い、ループの外には出さない

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{Instrument, debug, info, info_span, warn};

use super::engine::SyncEngine;
use crate::domain::{
    ActionId, DispatchResult, QueuedAction, RunFailure, RunId, RunReport, SyncError, SyncEvent,
    SyncState,
};
use crate::ports::Connectivity;
use crate::ports::connectivity::wait_offline;
use crate::queue::RetryPolicy;

/// dispatch 後に先頭をどう扱うか
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Deliver,
    Retry { reason: String },
    Quarantine { reason: String },
}

/// dispatch 結果と試行予算から次の手を決める（純粋関数）
fn decide(result: DispatchResult, attempts: u32, policy: &RetryPolicy) -> Step {
    match result {
        DispatchResult::Success => Step::Deliver,
        DispatchResult::Retryable(reason) if policy.allows_retry(attempts) => {
            Step::Retry { reason }
        }
        DispatchResult::Retryable(reason) | DispatchResult::Fatal(reason) => {
            Step::Quarantine { reason }
        }
    }
}

/// drain の future が途中で drop されたら run を Failed にする
struct RunGuard<'a> {
    engine: &'a SyncEngine,
    run_id: RunId,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let pending = self.engine.pending_count();
        let run_id = self.run_id;
        self.engine.inner.status_tx.send_if_modified(|status| {
            if status.state != SyncState::Syncing || status.run_id != Some(run_id) {
                return false;
            }
            status.fail(RunFailure::Shutdown.to_string(), pending);
            true
        });
        warn!(%run_id, "sync run abandoned");
    }
}

impl SyncEngine {
    /// Run the drain loop once.
    ///
    /// Returns `None` without doing anything if a run is already in progress.
    /// Dispatch failures never surface as errors: they end up in the report.
    pub async fn sync_now(&self) -> Option<RunReport> {
        let run_id = self.inner.ids.run_id();
        let started_at = self.inner.clock.now();
        let remaining = self.pending_count();

        let began = self
            .inner
            .status_tx
            .send_if_modified(|status| status.try_begin(run_id, remaining, started_at));
        if !began {
            debug!("sync already running, trigger dropped");
            return None;
        }

        let mut guard = RunGuard {
            engine: self,
            run_id,
            armed: true,
        };
        let report = self
            .drain(run_id, started_at)
            .instrument(info_span!("sync_run", %run_id))
            .await;
        guard.armed = false;

        self.finish(&report);
        Some(report)
    }

    async fn drain(&self, run_id: RunId, started_at: chrono::DateTime<chrono::Utc>) -> RunReport {
        let mut report = RunReport::new(run_id, started_at);
        let mut connectivity = self.inner.connectivity.subscribe();

        let pending = self.pending_count();
        info!(pending, "sync run started");
        self.emit(SyncEvent::RunStarted { run_id, pending });

        loop {
            if self.pending_count() == 0 {
                break;
            }
            if !connectivity.borrow_and_update().is_online() {
                report.failure = Some(RunFailure::ConnectivityLost);
                break;
            }

            let action = match self.begin_attempt().await {
                Ok(Some(action)) => action,
                Ok(None) => break,
                Err(e) => {
                    report.failure = Some(RunFailure::Storage(e.to_string()));
                    break;
                }
            };
            if let Err(failure) = self
                .attempt(run_id, action, &mut connectivity, &mut report)
                .await
            {
                report.failure = Some(failure);
                break;
            }
        }

        report.finished_at = self.inner.clock.now();
        report
    }

    /// One dispatch of the head and its consequence.
    async fn attempt(
        &self,
        run_id: RunId,
        action: QueuedAction,
        connectivity: &mut watch::Receiver<Connectivity>,
        report: &mut RunReport,
    ) -> Result<(), RunFailure> {
        let action_id = action.id();
        let attempts = action.attempts();
        let remaining = self.pending_count();
        self.inner
            .status_tx
            .send_modify(|status| status.set_in_flight(Some(action_id), remaining));
        debug!(%action_id, kind = %action.kind(), attempts, "dispatching");
        self.emit(SyncEvent::DispatchStarted {
            run_id,
            action_id,
            attempt: attempts,
        });
        report.dispatches += 1;

        let result = tokio::select! {
            biased;
            _ = wait_offline(connectivity) => None,
            result = self.dispatch_caught(&action) => Some(result),
        };
        let Some(result) = result else {
            // Cancelled mid-flight: counts as a retryable failure. `attempts`
            // is already persisted and the action stays at the head.
            warn!(%action_id, attempts, "connectivity lost during dispatch");
            return Err(RunFailure::ConnectivityLost);
        };

        match decide(result, attempts, &self.inner.policy) {
            Step::Deliver => {
                if !self.remove_by_id(action_id).await.map_err(storage_failure)? {
                    debug!(%action_id, "action left the queue during dispatch, not counted");
                    return Ok(());
                }
                info!(%action_id, attempts, "action delivered");
                report.delivered.push(action_id);
                self.advance();
                self.emit(SyncEvent::Delivered {
                    run_id,
                    action_id,
                    attempts,
                });
            }
            Step::Retry { reason } => {
                let delay = self.inner.policy.next_delay(attempts);
                info!(%action_id, attempts, delay_ms = delay.as_millis() as u64, %reason, "retry scheduled");
                report.retries += 1;
                self.emit(SyncEvent::RetryScheduled {
                    run_id,
                    action_id,
                    attempt: attempts,
                    delay_ms: delay.as_millis() as u64,
                    reason,
                });
                tokio::select! {
                    biased;
                    _ = wait_offline(connectivity) => return Err(RunFailure::ConnectivityLost),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Step::Quarantine { reason } => {
                if self
                    .quarantine_if_queued(action_id, reason)
                    .await
                    .map_err(storage_failure)?
                {
                    report.quarantined.push(action_id);
                    self.advance();
                }
            }
        }
        Ok(())
    }

    /// Dispatch through the configured dispatcher, turning a panic into
    /// `Retryable`.
    async fn dispatch_caught(&self, action: &QueuedAction) -> DispatchResult {
        match AssertUnwindSafe(self.inner.dispatcher.dispatch(action))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(action_id = %action.id(), kind = %action.kind(), %message, "dispatcher panicked");
                DispatchResult::retryable(format!("dispatcher panicked: {message}"))
            }
        }
    }

    /// Increment `attempts` on the head and persist. `None` on an empty queue.
    async fn begin_attempt(&self) -> Result<Option<QueuedAction>, SyncError> {
        let mut ledger = self.lock().await;
        let Some(id) = ledger.queue.peek_head().map(QueuedAction::id) else {
            return Ok(None);
        };
        let mut next = ledger.clone();
        next.queue.record_attempt(id);
        self.persist(&mut ledger, next).await?;
        Ok(ledger.queue.get(id).cloned())
    }

    /// Quarantine an action only if it is still queued. A concurrent
    /// `drain_all` or `remove_by_id` wins over a late dispatch failure.
    async fn quarantine_if_queued(&self, id: ActionId, reason: String) -> Result<bool, SyncError> {
        let mut ledger = self.lock().await;
        let Some(action) = ledger.queue.get(id).cloned() else {
            debug!(action_id = %id, "action left the queue during dispatch, not quarantining");
            return Ok(false);
        };
        self.quarantine_locked(&mut ledger, action, reason).await?;
        Ok(true)
    }

    fn advance(&self) {
        let remaining = self.pending_count();
        self.inner
            .status_tx
            .send_modify(|status| status.advance(remaining));
    }

    fn finish(&self, report: &RunReport) {
        let pending = self.pending_count();
        match &report.failure {
            None => {
                let now = report.finished_at;
                self.inner.status_tx.send_modify(|status| status.complete(now));
                self.inner.status_tx.send_modify(|status| status.settle());
                info!(
                    run_id = %report.run_id,
                    delivered = report.delivered.len(),
                    quarantined = report.quarantined.len(),
                    retries = report.retries,
                    "sync run completed"
                );
            }
            Some(failure) => {
                let error = failure.to_string();
                self.inner
                    .status_tx
                    .send_modify(|status| status.fail(error, pending));
                warn!(
                    run_id = %report.run_id,
                    %failure,
                    delivered = report.delivered.len(),
                    pending,
                    "sync run failed"
                );
            }
        }
        self.emit(SyncEvent::RunFinished {
            run_id: report.run_id,
            delivered: report.delivered.len(),
            quarantined: report.quarantined.len(),
            failure: report.failure.clone(),
        });
    }
}

fn storage_failure(e: SyncError) -> RunFailure {
    RunFailure::Storage(e.to_string())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::success(DispatchResult::Success, 1, Step::Deliver)]
    #[case::retry_under_budget(
        DispatchResult::retryable("503"),
        4,
        Step::Retry { reason: "503".into() }
    )]
    #[case::retry_exhausted(
        DispatchResult::retryable("503"),
        5,
        Step::Quarantine { reason: "503".into() }
    )]
    #[case::fatal_first_try(
        DispatchResult::fatal("400"),
        1,
        Step::Quarantine { reason: "400".into() }
    )]
    fn decide_against_budget(
        #[case] result: DispatchResult,
        #[case] attempts: u32,
        #[case] expected: Step,
    ) {
        assert_eq!(decide(result, attempts, &RetryPolicy::immediate(5)), expected);
    }
}
