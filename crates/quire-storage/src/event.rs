//! Change notification types returned by [`Storage::watch`](crate::Storage::watch).

use std::sync::mpsc;
use std::time::Duration;

/// Kind of change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageEventKind {
    /// File appeared.
    Created,
    /// File content changed.
    Modified,
    /// File disappeared.
    Removed,
}

/// A debounced change to one pathname.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    /// Project-relative pathname (e.g. `docs/cs/index.md`, `docs/config.yml`).
    pub pathname: String,
    /// Kind of change.
    pub kind: StorageEventKind,
}

impl StorageEvent {
    /// Create an event.
    #[must_use]
    pub fn new(pathname: impl Into<String>, kind: StorageEventKind) -> Self {
        Self {
            pathname: pathname.into(),
            kind,
        }
    }
}

/// Receiving side of a watch.
pub struct StorageEventReceiver {
    rx: mpsc::Receiver<StorageEvent>,
}

impl StorageEventReceiver {
    pub(crate) fn new(rx: mpsc::Receiver<StorageEvent>) -> Self {
        Self { rx }
    }

    /// Block until the next event. `None` once the watcher is gone.
    #[must_use]
    pub fn recv(&self) -> Option<StorageEvent> {
        self.rx.recv().ok()
    }

    /// Wait at most `timeout` for the next event.
    ///
    /// `Ok(None)` on timeout, `Err(())` once the watcher is gone.
    #[allow(clippy::result_unit_err)]
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<StorageEvent>, ()> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(()),
        }
    }

    /// Next event if one is ready.
    #[must_use]
    pub fn try_recv(&self) -> Option<StorageEvent> {
        self.rx.try_recv().ok()
    }

    /// Receiver that never yields; used by backends without notification.
    pub(crate) fn no_op() -> Self {
        let (_tx, rx) = mpsc::channel();
        Self { rx }
    }
}

/// Keeps a watch alive. Dropping it stops the watcher thread.
pub struct WatchHandle {
    _shutdown: Option<mpsc::Sender<()>>,
}

impl WatchHandle {
    pub(crate) fn new(shutdown: mpsc::Sender<()>) -> Self {
        Self {
            _shutdown: Some(shutdown),
        }
    }

    /// Stop watching now.
    pub fn stop(mut self) {
        self._shutdown.take();
    }

    pub(crate) fn no_op() -> Self {
        Self { _shutdown: None }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_receiver_delivers_in_order() {
        let (tx, rx) = mpsc::channel();
        let receiver = StorageEventReceiver::new(rx);

        tx.send(StorageEvent::new("docs/a.md", StorageEventKind::Created))
            .unwrap();
        tx.send(StorageEvent::new("docs/config.yml", StorageEventKind::Modified))
            .unwrap();

        assert_eq!(receiver.recv().unwrap().pathname, "docs/a.md");
        assert_eq!(receiver.try_recv().unwrap().pathname, "docs/config.yml");
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_recv_timeout_distinguishes_timeout_and_disconnect() {
        let (tx, rx) = mpsc::channel::<StorageEvent>();
        let receiver = StorageEventReceiver::new(rx);

        assert_eq!(receiver.recv_timeout(Duration::from_millis(1)), Ok(None));
        drop(tx);
        assert_eq!(receiver.recv_timeout(Duration::from_millis(1)), Err(()));
    }

    #[test]
    fn test_no_op_receiver_is_empty() {
        assert!(StorageEventReceiver::no_op().try_recv().is_none());
    }

    #[test]
    fn test_dropping_handle_closes_shutdown_channel() {
        let (tx, rx) = mpsc::channel();
        let handle = WatchHandle::new(tx);

        drop(handle);

        assert!(rx.recv().is_err());
    }

    static_assertions::assert_impl_all!(WatchHandle: Send);
    static_assertions::assert_impl_all!(StorageEventReceiver: Send);
}
