use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Dispatcher, Task};

/// A dispatcher that only runs tasks when told to.
///
/// Tasks queue up until [`run_until_idle`](Self::run_until_idle) or
/// [`run_next`](Self::run_next) executes them on the calling thread. This makes
/// flush timing fully deterministic in tests: everything enqueued before the
/// call is visible to the flush that call runs.
///
/// Panics raised by a task propagate to the caller of `run_*`.
#[derive(Clone, Default)]
pub struct ManualDispatcher {
    tasks: Arc<Mutex<VecDeque<Task>>>,
}

impl ManualDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Runs the oldest queued task. Returns false if there was none.
    pub fn run_next(&self) -> bool {
        // Pop before running: the task may dispatch more tasks.
        let task = self.tasks.lock().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs tasks until the queue is empty, including tasks dispatched by
    /// the tasks being run. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Dispatcher for ManualDispatcher {
    fn dispatch(&self, task: Task) {
        self.tasks.lock().push_back(task);
    }
}

impl std::fmt::Debug for ManualDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualDispatcher")
            .field("pending", &self.pending())
            .finish()
    }
}
