//! Pending writes and reads, shared between producer threads and the flush loop.

use std::collections::VecDeque;

use parking_lot::Mutex;
use smallvec::SmallVec;

/// A queued write: takes the current state and returns the next one.
pub type Reducer<S> = Box<dyn FnOnce(S) -> S + Send + 'static>;

/// A queued read: receives a snapshot of the state once it is its turn.
pub type ReadCallback<S> = Box<dyn FnOnce(S) + Send + 'static>;

/// Batch of writes taken out of the queue in one go.
///
/// Most flushes see a handful of writes, so they stay inline.
pub type WriteBatch<S> = SmallVec<[Reducer<S>; 4]>;

struct Jobs<S> {
    writes: WriteBatch<S>,
    reads: VecDeque<ReadCallback<S>>,
}

/// Two FIFO sequences behind a single lock.
///
/// Order between producers on different threads is the order in which their
/// enqueue calls acquire the lock.
pub(crate) struct JobQueue<S> {
    jobs: Mutex<Jobs<S>>,
}

impl<S> JobQueue<S> {
    pub(crate) fn new() -> Self {
        Self {
            jobs: Mutex::new(Jobs {
                writes: SmallVec::new(),
                reads: VecDeque::new(),
            }),
        }
    }

    pub(crate) fn enqueue_write(&self, reducer: Reducer<S>) {
        self.jobs.lock().writes.push(reducer);
    }

    pub(crate) fn enqueue_read(&self, callback: ReadCallback<S>) {
        self.jobs.lock().reads.push_back(callback);
    }

    /// Removes and returns every pending write, leaving the sequence empty.
    ///
    /// An empty queue yields an empty batch without allocating.
    pub(crate) fn drain_writes(&self) -> WriteBatch<S> {
        std::mem::take(&mut self.jobs.lock().writes)
    }

    /// Removes and returns the oldest pending read.
    pub(crate) fn take_one_read(&self) -> Option<ReadCallback<S>> {
        self.jobs.lock().reads.pop_front()
    }

    /// Number of pending `(writes, reads)`.
    pub(crate) fn pending(&self) -> (usize, usize) {
        let jobs = self.jobs.lock();
        (jobs.writes.len(), jobs.reads.len())
    }

    /// Drops all pending work without running it.
    ///
    /// Returns how many jobs were discarded.
    pub(crate) fn clear(&self) -> usize {
        let (writes, reads) = {
            let mut jobs = self.jobs.lock();
            (
                std::mem::take(&mut jobs.writes),
                std::mem::take(&mut jobs.reads),
            )
        };
        // Closures may own store handles; drop them with the lock released.
        writes.len() + reads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn drain_writes_returns_in_enqueue_order_and_empties_queue() {
        let queue: JobQueue<Vec<u32>> = JobQueue::new();
        for n in 1..=3 {
            queue.enqueue_write(Box::new(move |mut v: Vec<u32>| {
                v.push(n);
                v
            }));
        }

        let batch = queue.drain_writes();
        assert_eq!(batch.len(), 3);
        let folded = batch.into_iter().fold(Vec::new(), |state, r| r(state));
        assert_eq!(folded, vec![1, 2, 3]);

        assert!(queue.drain_writes().is_empty());
        assert_eq!(queue.pending(), (0, 0));
    }

    #[test]
    fn take_one_read_is_fifo() {
        let queue: JobQueue<u32> = JobQueue::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = seen.clone();
            queue.enqueue_read(Box::new(move |s| seen.lock().push((tag, s))));
        }

        queue.take_one_read().unwrap()(7);
        assert_eq!(queue.pending(), (0, 1));
        queue.take_one_read().unwrap()(8);
        assert!(queue.take_one_read().is_none());

        assert_eq!(*seen.lock(), vec![("a", 7), ("b", 8)]);
    }

    #[test]
    fn clear_discards_without_running() {
        let queue: JobQueue<u32> = JobQueue::new();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let flag = ran.clone();
        queue.enqueue_write(Box::new(move |s| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            s
        }));
        let flag = ran.clone();
        queue.enqueue_read(Box::new(move |_| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        }));

        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.pending(), (0, 0));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
