//! Online/offline signal shared between the platform and the synchronizer.
//!
//! The platform (or a test) flips the flag; the synchronizer subscribes once
//! and flushes its queue on every offline-to-online transition.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Clone, Debug)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn online() -> Self {
        Self::new(true)
    }

    #[must_use]
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Publishes a new state. Returns whether it differed from the old one;
    /// subscribers are only woken on a change.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// A receiver that has already seen the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_wake_only_on_change() {
        let connectivity = Connectivity::online();
        let mut rx = connectivity.subscribe();

        assert!(!connectivity.set_online(true));
        assert!(!rx.has_changed().unwrap());

        assert!(connectivity.set_online(false));
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
        assert!(!connectivity.is_online());
    }

    #[test]
    fn clones_share_state() {
        let a = Connectivity::offline();
        let b = a.clone();
        b.set_online(true);
        assert!(a.is_online());
    }
}
