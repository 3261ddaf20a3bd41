//! The flush loop: turns queued jobs into state transitions and reads.
//!
//! One call handles everything pending:
//!
//! ```text
//! loop {
//!     writes = drain_writes()          // all of them, lock released after
//!     if writes: publish(fold(writes)) // N writes -> at most one emission
//!     read = take_one_read() else stop
//!     read(current)                    // may enqueue more writes/reads
//! }
//! ```
//!
//! Reads are served one per iteration so that writes enqueued by a read
//! callback land before the next read observes the state.

use crate::store::Shared;

/// Re-signals the trigger if a reducer or read callback unwinds out of the
/// loop with jobs still queued. The pending flag was already cleared, so
/// without this those jobs would wait for unrelated new work.
struct RescheduleOnPanic<'a, S> {
    shared: &'a Shared<S>,
}

impl<S> Drop for RescheduleOnPanic<'_, S> {
    fn drop(&mut self) {
        if !std::thread::panicking() || self.shared.trigger.is_disposed() {
            return;
        }
        let pending = self.shared.queue.pending();
        if pending != (0, 0) {
            tracing::warn!(
                store = %self.shared.name,
                writes = pending.0,
                reads = pending.1,
                "flush unwound, rescheduling remaining jobs"
            );
            self.shared.trigger.signal();
        }
    }
}

/// Runs on the dispatcher only. Never call it from a producer thread.
pub(crate) fn run<S>(shared: &Shared<S>)
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    // Clear before draining: anything enqueued from here on needs, and gets,
    // another flush.
    shared.trigger.acknowledge();
    if shared.trigger.is_disposed() {
        tracing::trace!(store = %shared.name, "flush skipped, store disposed");
        return;
    }
    shared.counters.record_flush();

    let _guard = RescheduleOnPanic { shared };
    let mut reads = 0usize;
    loop {
        if shared.trigger.is_disposed() {
            tracing::trace!(store = %shared.name, "flush stopped, store disposed");
            return;
        }

        let writes = shared.queue.drain_writes();
        if !writes.is_empty() {
            let applied = writes.len();
            let next = writes
                .into_iter()
                .fold(shared.cell.current(), |state, reducer| reducer(state));
            let published = shared.cell.publish(next);
            shared.counters.record_writes(applied, published);
            tracing::debug!(
                store = %shared.name,
                store_id = %shared.id,
                applied,
                published,
                "applied coalesced writes"
            );
        }

        let Some(read) = shared.queue.take_one_read() else {
            break;
        };
        read(shared.cell.current());
        shared.counters.record_read();
        reads += 1;
    }

    tracing::trace!(store = %shared.name, reads, "flush complete");
}
