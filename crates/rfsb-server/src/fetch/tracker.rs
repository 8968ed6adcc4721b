//! Completion tracking for one fetch.
//!
//! Work is counted through two RAII handles:
//! - [`DiscoveryGuard`]: a unit of discovery still in flight (the request
//!   itself, or one directory being listed).
//! - [`FileTicket`]: one discovered file whose chunks are not all emitted.
//!
//! Tickets and child guards can only be created from a live guard, so a
//! directory's children are always registered before its own guard is
//! released. Dropping a handle is the only way to decrement, which makes
//! every file finish exactly once on every exit path. The fetch is done
//! when no tickets and no guards remain.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::trace;

/// Lifecycle of a fetch as seen by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Files are still streaming.
    Active,
    /// No file is streaming, but discovery is still in flight.
    Draining,
    /// Nothing outstanding; the output stream may be closed.
    Done,
}

/// Point-in-time view of the tracker counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub phase: Phase,
    /// Files discovered but not yet finished.
    pub pending_files: usize,
    /// Discovery units still in flight.
    pub pending_discoveries: usize,
    /// Files discovered so far.
    pub discovered: u64,
    /// Files finished so far.
    pub finished: u64,
}

#[derive(Debug, Default)]
struct Counts {
    pending_files: usize,
    pending_discoveries: usize,
    discovered: u64,
    finished: u64,
}

impl Counts {
    fn phase(&self) -> Phase {
        match (self.pending_files, self.pending_discoveries) {
            (0, 0) => Phase::Done,
            (0, _) => Phase::Draining,
            _ => Phase::Active,
        }
    }
}

struct TrackerInner {
    counts: Mutex<Counts>,
    phase: watch::Sender<Phase>,
}

impl TrackerInner {
    fn lock(&self) -> MutexGuard<'_, Counts> {
        // Counter updates never panic while holding the lock.
        self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `update` and publish the resulting phase.
    fn update(&self, update: impl FnOnce(&mut Counts)) {
        let mut counts = self.lock();
        debug_assert!(
            *self.phase.borrow() != Phase::Done,
            "tracker updated after completion"
        );
        update(&mut counts);
        let phase = counts.phase();
        trace!(
            ?phase,
            pending_files = counts.pending_files,
            pending_discoveries = counts.pending_discoveries,
            "tracker update"
        );
        self.phase.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }
}

/// Determines when every discovered file of a fetch has finished.
#[derive(Clone)]
pub struct CompletionTracker {
    inner: Arc<TrackerInner>,
}

impl CompletionTracker {
    /// Create a tracker together with the root discovery guard.
    ///
    /// The tracker cannot reach [`Phase::Done`] until the root guard is
    /// dropped, so the caller registers all top-level work through it first.
    pub fn new() -> (Self, DiscoveryGuard) {
        let (phase, _) = watch::channel(Phase::Draining);
        let inner = Arc::new(TrackerInner {
            counts: Mutex::new(Counts {
                pending_discoveries: 1,
                ..Counts::default()
            }),
            phase,
        });
        let root = DiscoveryGuard {
            inner: Arc::clone(&inner),
        };
        (Self { inner }, root)
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        *self.inner.phase.borrow()
    }

    /// Current counters.
    pub fn snapshot(&self) -> TrackerSnapshot {
        let counts = self.inner.lock();
        TrackerSnapshot {
            phase: counts.phase(),
            pending_files: counts.pending_files,
            pending_discoveries: counts.pending_discoveries,
            discovered: counts.discovered,
            finished: counts.finished,
        }
    }

    /// Wait until the tracker reaches [`Phase::Done`].
    pub async fn wait_done(&self) {
        let mut rx = self.inner.phase.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot fail.
        let _ = rx.wait_for(|phase| *phase == Phase::Done).await;
    }
}

/// A unit of discovery in flight.
///
/// Keeps the fetch from completing while it is alive.
#[must_use = "dropping a discovery guard releases it immediately"]
pub struct DiscoveryGuard {
    inner: Arc<TrackerInner>,
}

impl DiscoveryGuard {
    /// Register `count` discovered files, returning one ticket each.
    pub fn discover_files(&self, count: usize) -> Vec<FileTicket> {
        if count == 0 {
            return Vec::new();
        }
        self.inner.update(|counts| {
            counts.pending_files += count;
            counts.discovered += count as u64;
        });
        (0..count)
            .map(|_| FileTicket {
                inner: Arc::clone(&self.inner),
            })
            .collect()
    }

    /// Register a child unit of discovery, such as a subdirectory to list.
    pub fn discover_subdir(&self) -> DiscoveryGuard {
        self.inner.update(|counts| counts.pending_discoveries += 1);
        DiscoveryGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for DiscoveryGuard {
    fn drop(&mut self) {
        self.inner.update(|counts| counts.pending_discoveries -= 1);
    }
}

/// One discovered file that has not finished streaming.
#[must_use = "dropping a file ticket marks the file finished"]
pub struct FileTicket {
    inner: Arc<TrackerInner>,
}

impl FileTicket {
    /// Mark the file finished.
    pub fn finish(self) {}
}

impl Drop for FileTicket {
    fn drop(&mut self) {
        self.inner.update(|counts| {
            counts.pending_files -= 1;
            counts.finished += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_request_is_done_when_root_drops() {
        let (tracker, root) = CompletionTracker::new();
        assert_eq!(tracker.phase(), Phase::Draining);
        drop(root);
        assert_eq!(tracker.phase(), Phase::Done);
    }

    #[test]
    fn files_keep_tracker_active() {
        let (tracker, root) = CompletionTracker::new();
        let mut tickets = root.discover_files(2);
        drop(root);
        assert_eq!(tracker.phase(), Phase::Active);

        tickets.pop().unwrap().finish();
        assert_eq!(tracker.phase(), Phase::Active);
        tickets.pop().unwrap().finish();
        assert_eq!(tracker.phase(), Phase::Done);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.discovered, 2);
        assert_eq!(snapshot.finished, 2);
        assert_eq!(snapshot.pending_files, 0);
    }

    #[test]
    fn nested_directory_prevents_spurious_zero() {
        // dirs=["d"], d has no direct files and one subdirectory with one file
        let (tracker, root) = CompletionTracker::new();
        let d = root.discover_subdir();
        drop(root);

        // Listing of d: zero files, one subdirectory
        assert!(d.discover_files(0).is_empty());
        let sub = d.discover_subdir();
        drop(d);
        assert_eq!(tracker.phase(), Phase::Draining);
        assert_eq!(tracker.snapshot().pending_files, 0);

        // Listing of d/sub: one file
        let ticket = sub.discover_files(1).pop().unwrap();
        drop(sub);
        assert_eq!(tracker.phase(), Phase::Active);

        ticket.finish();
        assert_eq!(tracker.phase(), Phase::Done);
    }

    #[test]
    fn ticket_outliving_guard_keeps_fetch_open() {
        let (tracker, root) = CompletionTracker::new();
        let ticket = root.discover_files(1).pop().unwrap();
        drop(root);
        assert_ne!(tracker.phase(), Phase::Done);
        drop(ticket);
        assert_eq!(tracker.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn wait_done_resolves_after_last_ticket() {
        let (tracker, root) = CompletionTracker::new();
        let tickets = root.discover_files(3);
        drop(root);

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait_done().await })
        };

        for ticket in tickets {
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert!(!waiter.is_finished());
            tokio::task::spawn_blocking(move || ticket.finish())
                .await
                .unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("tracker never completed")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_done_returns_immediately_when_done() {
        let (tracker, root) = CompletionTracker::new();
        drop(root);
        tokio::time::timeout(Duration::from_secs(1), tracker.wait_done())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn panicking_task_still_finishes_its_file() {
        let (tracker, root) = CompletionTracker::new();
        let ticket = root.discover_files(1).pop().unwrap();
        drop(root);

        let handle = tokio::spawn(async move {
            let _ticket = ticket;
            panic!("producer blew up");
        });
        assert!(handle.await.is_err());
        assert_eq!(tracker.phase(), Phase::Done);
    }
}
