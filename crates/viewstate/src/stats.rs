//! Flush counters.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Point-in-time view of a store's activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Flush tasks run by the dispatcher.
    pub flushes: u64,
    /// Reducers applied.
    pub writes_applied: u64,
    /// Read callbacks invoked.
    pub reads_served: u64,
    /// Distinct states published, not counting the initial state.
    pub published: u64,
    /// Coalesced write batches whose result equalled the current state.
    pub unchanged: u64,
    /// Jobs dropped because the store was disposed.
    pub discarded: u64,
    pub last_flush_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub(crate) struct Counters {
    flushes: AtomicU64,
    writes_applied: AtomicU64,
    reads_served: AtomicU64,
    published: AtomicU64,
    unchanged: AtomicU64,
    discarded: AtomicU64,
    last_flush_at: Mutex<Option<DateTime<Utc>>>,
}

impl Counters {
    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        *self.last_flush_at.lock() = Some(Utc::now());
    }

    pub(crate) fn record_writes(&self, applied: usize, published: bool) {
        self.writes_applied.fetch_add(applied as u64, Ordering::Relaxed);
        if published {
            self.published.fetch_add(1, Ordering::Relaxed);
        } else {
            self.unchanged.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_read(&self) {
        self.reads_served.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self, jobs: usize) {
        self.discarded.fetch_add(jobs as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StoreStats {
        StoreStats {
            flushes: self.flushes.load(Ordering::Relaxed),
            writes_applied: self.writes_applied.load(Ordering::Relaxed),
            reads_served: self.reads_served.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            last_flush_at: *self.last_flush_at.lock(),
        }
    }
}
