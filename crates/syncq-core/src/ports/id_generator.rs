//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: [`Clock`] の時刻で ULID を生成。時計が進まなくても
//!   同一 generator 内では単調増加

use std::sync::Mutex;

use ulid::Ulid;

use crate::domain::ids::{ActionId, RunId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn action_id(&self) -> ActionId;

    fn run_id(&self) -> RunId;
}

impl<G: IdGenerator + ?Sized> IdGenerator for std::sync::Arc<G> {
    fn action_id(&self) -> ActionId {
        (**self).action_id()
    }

    fn run_id(&self) -> RunId {
        (**self).run_id()
    }
}

pub struct UlidGenerator<C> {
    clock: C,
    last: Mutex<Option<Ulid>>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last: Mutex::new(None),
        }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        // 前回と同じ（か過去の）ミリ秒: 乱数部をインクリメントして単調性を保つ
        let next = match *last {
            Some(prev) if prev.timestamp_ms() >= timestamp_ms => prev
                .increment()
                .unwrap_or_else(|| Ulid::from_parts(prev.timestamp_ms() + 1, rand::random())),
            _ => Ulid::from_parts(timestamp_ms, rand::random()),
        };
        *last = Some(next);
        next
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn action_id(&self) -> ActionId {
        ActionId::from(self.next())
    }

    fn run_id(&self) -> RunId {
        RunId::from(self.next())
    }
}
