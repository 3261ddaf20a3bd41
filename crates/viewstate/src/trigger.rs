//! Wake-up signal between producers and the flush loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dispatch::Dispatcher;

/// Schedules flushes on a dispatcher, at most one outstanding at a time.
///
/// `pending` is set by the signal that schedules a flush and cleared by that
/// flush before it drains the queue. Signals in between are absorbed: the
/// scheduled flush has not drained yet, so it will see their work. Work
/// enqueued after the flush cleared the flag schedules a new one.
pub(crate) struct Trigger {
    pending: AtomicBool,
    disposed: AtomicBool,
    dispatcher: Arc<dyn Dispatcher>,
    flush: Arc<dyn Fn() + Send + Sync>,
}

impl Trigger {
    pub(crate) fn new(dispatcher: Arc<dyn Dispatcher>, flush: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            pending: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            dispatcher,
            flush,
        }
    }

    /// Requests a flush. Returns true if this call scheduled one, false if it
    /// was coalesced into an outstanding flush or the trigger is disposed.
    pub(crate) fn signal(&self) -> bool {
        if self.is_disposed() {
            return false;
        }
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }

        let flush = self.flush.clone();
        self.dispatcher.dispatch(Box::new(move || flush()));
        true
    }

    /// Called by the flush task before it drains the queue.
    pub(crate) fn acknowledge(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    /// Stops scheduling flushes. Returns true only for the call that
    /// actually disposed.
    pub(crate) fn dispose(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
