//! Coalesces raw watcher notifications into one event per pathname.
//!
//! Editors typically emit several notifications per save (truncate, write,
//! rename). Each pathname keeps a single pending kind whose deadline moves
//! forward with every new notification.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::event::{StorageEvent, StorageEventKind};

struct Pending {
    kind: StorageEventKind,
    deadline: Instant,
}

pub(crate) struct EventDebouncer {
    pending: Mutex<HashMap<String, Pending>>,
    quiet: Duration,
}

impl EventDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            quiet,
        }
    }

    /// Record a notification for `pathname`.
    pub fn record(&self, pathname: String, kind: StorageEventKind) {
        use std::collections::hash_map::Entry;

        let deadline = Instant::now() + self.quiet;
        let mut pending = self.pending.lock().unwrap();

        match pending.entry(pathname) {
            Entry::Vacant(slot) => {
                slot.insert(Pending { kind, deadline });
            }
            Entry::Occupied(mut slot) => match merge(slot.get().kind, kind) {
                Some(merged) => {
                    *slot.get_mut() = Pending {
                        kind: merged,
                        deadline,
                    };
                }
                None => {
                    slot.remove();
                }
            },
        }
    }

    /// Take every event whose quiet period has elapsed.
    pub fn drain_ready(&self) -> Vec<StorageEvent> {
        let now = Instant::now();
        let mut pending = self.pending.lock().unwrap();

        let mut ready: Vec<StorageEvent> = pending
            .extract_if(|_, p| p.deadline <= now)
            .map(|(pathname, p)| StorageEvent::new(pathname, p.kind))
            .collect();
        // Stable delivery order for callers applying events serially.
        ready.sort_by(|a, b| a.pathname.cmp(&b.pathname));
        ready
    }
}

/// Merge a new notification into a pending one.
///
/// `None` means the pathname never existed as far as consumers are concerned.
#[allow(clippy::match_same_arms)]
fn merge(pending: StorageEventKind, new: StorageEventKind) -> Option<StorageEventKind> {
    use StorageEventKind::{Created, Modified, Removed};

    match (pending, new) {
        (Created, Removed) => None,
        (Created, _) => Some(Created),
        (Modified, Created) => Some(Created),
        (Modified, Modified) => Some(Modified),
        (Modified, Removed) => Some(Removed),
        // Replaced in place (atomic-save editors).
        (Removed, Created) => Some(Modified),
        (Removed, _) => Some(Removed),
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use pretty_assertions::assert_eq;

    use super::*;
    use StorageEventKind::{Created, Modified, Removed};

    const QUIET: Duration = Duration::from_millis(10);

    fn settle() {
        thread::sleep(Duration::from_millis(20));
    }

    #[test]
    fn test_event_waits_for_quiet_period() {
        let debouncer = EventDebouncer::new(QUIET);
        debouncer.record("docs/a.md".to_owned(), Modified);

        assert!(debouncer.drain_ready().is_empty());
        settle();
        assert_eq!(
            debouncer.drain_ready(),
            vec![StorageEvent::new("docs/a.md", Modified)]
        );
        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_save_burst_collapses() {
        let debouncer = EventDebouncer::new(QUIET);
        for _ in 0..3 {
            debouncer.record("docs/a.md".to_owned(), Modified);
        }
        settle();

        assert_eq!(debouncer.drain_ready().len(), 1);
    }

    #[test]
    fn test_create_then_remove_is_dropped() {
        let debouncer = EventDebouncer::new(QUIET);
        debouncer.record("docs/tmp.md".to_owned(), Created);
        debouncer.record("docs/tmp.md".to_owned(), Removed);
        settle();

        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_drain_is_sorted_by_pathname() {
        let debouncer = EventDebouncer::new(QUIET);
        debouncer.record("docs/b.md".to_owned(), Modified);
        debouncer.record("docs/a.md".to_owned(), Created);
        settle();

        let names: Vec<String> = debouncer
            .drain_ready()
            .into_iter()
            .map(|e| e.pathname)
            .collect();
        assert_eq!(names, vec!["docs/a.md", "docs/b.md"]);
    }

    #[test]
    fn test_merge_table() {
        assert_eq!(merge(Created, Created), Some(Created));
        assert_eq!(merge(Created, Modified), Some(Created));
        assert_eq!(merge(Created, Removed), None);
        assert_eq!(merge(Modified, Created), Some(Created));
        assert_eq!(merge(Modified, Modified), Some(Modified));
        assert_eq!(merge(Modified, Removed), Some(Removed));
        assert_eq!(merge(Removed, Created), Some(Modified));
        assert_eq!(merge(Removed, Modified), Some(Removed));
        assert_eq!(merge(Removed, Removed), Some(Removed));
    }
}
