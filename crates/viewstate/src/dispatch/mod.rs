//! Execution contexts for the flush loop.
//!
//! A store never runs its flush loop on the caller's thread. It hands a
//! [`Task`] to the [`Dispatcher`] it was built with, and the dispatcher runs
//! tasks one at a time, in submission order. That serial execution is the
//! only thing that makes state mutation single-threaded, so every
//! implementation must uphold it.
//!
//! Three implementations ship with the crate:
//!
//! | Dispatcher            | Runs tasks on                    | Task panics        |
//! |-----------------------|----------------------------------|--------------------|
//! | [`ManualDispatcher`]  | whichever thread calls `run_*`   | propagate          |
//! | [`TokioDispatcher`]   | one task on a tokio runtime      | logged, loop lives |
//! | [`ThreadDispatcher`]  | one dedicated OS thread          | logged, loop lives |
//!
//! Several stores may share one dispatcher; their flushes then interleave
//! at task granularity but never overlap.

mod manual;
mod runtime;
mod thread;

pub use manual::ManualDispatcher;
pub use runtime::TokioDispatcher;
pub use thread::{ThreadDispatcher, ThreadDispatcherBuilder};

use std::panic::{catch_unwind, AssertUnwindSafe};

/// A unit of work submitted to a dispatcher.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A serial execution context.
///
/// Implementations must run submitted tasks one at a time, in the order
/// `dispatch` was called, and never concurrently with each other. `dispatch`
/// itself must not block and must not run the task inline.
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, task: Task);
}

impl<D: Dispatcher + ?Sized> Dispatcher for std::sync::Arc<D> {
    fn dispatch(&self, task: Task) {
        (**self).dispatch(task)
    }
}

/// Runs a task on a background worker, turning a panic into a log line so
/// the worker keeps serving later tasks.
pub(crate) fn run_isolated(worker: &str, task: Task) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(worker, panic = %message, "dispatched task panicked");
    }
}
