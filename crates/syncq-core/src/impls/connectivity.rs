//! ManualConnectivity: a connectivity monitor driven by explicit calls.
//!
//! Platform integrations (network reachability callbacks, etc.) forward their
//! transitions into `set`. Tests flip it directly.

use tokio::sync::watch;
use tracing::info;

use crate::ports::{Connectivity, ConnectivityMonitor};

#[derive(Debug)]
pub struct ManualConnectivity {
    tx: watch::Sender<Connectivity>,
}

impl ManualConnectivity {
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn online() -> Self {
        Self::new(Connectivity::Online)
    }

    pub fn offline() -> Self {
        Self::new(Connectivity::Offline)
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    /// Publish a new state. Repeating the current state notifies nobody.
    pub fn set(&self, to: Connectivity) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == to {
                return false;
            }
            *current = to;
            true
        });
        if changed {
            info!(connectivity = ?to, "connectivity changed");
        }
    }

    pub fn set_online(&self) {
        self.set(Connectivity::Online);
    }

    pub fn set_offline(&self) {
        self.set(Connectivity::Offline);
    }
}

impl ConnectivityMonitor for ManualConnectivity {
    fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let monitor = ManualConnectivity::offline();
        let mut rx = monitor.subscribe();
        assert!(!rx.borrow_and_update().is_online());

        monitor.set_online();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_online());
    }

    #[test]
    fn repeating_state_is_not_a_change() {
        let monitor = ManualConnectivity::online();
        let mut rx = monitor.subscribe();
        rx.borrow_and_update();

        monitor.set_online();
        assert!(!rx.has_changed().unwrap());
        assert_eq!(monitor.current(), Connectivity::Online);
    }
}
