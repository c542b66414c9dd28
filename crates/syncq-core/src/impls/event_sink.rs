//! EventSink implementations.

use tokio::sync::broadcast;

use crate::domain::SyncEvent;
use crate::ports::EventSink;

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &SyncEvent) {}
}

/// Fans events out to any number of UI subscribers.
///
/// Slow subscribers lag and lose the oldest events; the engine never waits.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<SyncEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: &SyncEvent) {
        // no receivers is fine
        let _ = self.sender.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let sink = BroadcastEventSink::new(8);
        let mut a = sink.subscribe();
        let mut b = sink.subscribe();

        sink.emit(&SyncEvent::Drained { count: 3 });

        assert_eq!(a.recv().await.unwrap(), SyncEvent::Drained { count: 3 });
        assert_eq!(b.recv().await.unwrap(), SyncEvent::Drained { count: 3 });
    }

    #[test]
    fn emit_without_subscribers_does_not_fail() {
        BroadcastEventSink::default().emit(&SyncEvent::Drained { count: 0 });
        NoopEventSink.emit(&SyncEvent::Drained { count: 0 });
    }
}
