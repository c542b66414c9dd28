//! EventSink port - [`SyncEvent`] を観測者へ通知
//!
//! `emit` は同期呼び出しで、ブロックしてはいけません。
//! キューと quarantine のイベントは書き込みロックを保持したまま emit されるため、
//! 状態が変化した順に届きます。

use crate::domain::SyncEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SyncEvent);
}

impl<E: EventSink + ?Sized> EventSink for std::sync::Arc<E> {
    fn emit(&self, event: &SyncEvent) {
        (**self).emit(event)
    }
}
