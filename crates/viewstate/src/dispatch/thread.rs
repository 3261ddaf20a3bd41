use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;

use super::{run_isolated, Dispatcher, Task};
use crate::error::DispatchError;

const DEFAULT_THREAD_NAME: &str = "viewstate-dispatch";

/// Runs tasks on a dedicated OS thread.
///
/// Closest to a UI main loop: every flush of every store using this
/// dispatcher happens on the same thread. Dropping the dispatcher closes its
/// queue, lets the thread finish the tasks already queued, and joins it.
pub struct ThreadDispatcher {
    tx: Option<mpsc::UnboundedSender<Task>>,
    handle: Option<JoinHandle<()>>,
}

/// Configuration for a [`ThreadDispatcher`].
#[derive(Debug, Clone)]
pub struct ThreadDispatcherBuilder {
    name: String,
    stack_size: Option<usize>,
}

impl ThreadDispatcherBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn spawn(self) -> Result<ThreadDispatcher, DispatchError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();

        let mut builder = thread::Builder::new().name(self.name.clone());
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }

        let worker = self.name.clone();
        let handle = builder
            .spawn(move || {
                while let Some(task) = rx.blocking_recv() {
                    run_isolated(&worker, task);
                }
                tracing::trace!(worker = %worker, "thread dispatcher stopped");
            })
            .map_err(|source| DispatchError::Spawn {
                name: self.name,
                source,
            })?;

        Ok(ThreadDispatcher {
            tx: Some(tx),
            handle: Some(handle),
        })
    }
}

impl ThreadDispatcher {
    pub fn builder() -> ThreadDispatcherBuilder {
        ThreadDispatcherBuilder {
            name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }

    /// Spawns a dispatcher thread with the given name.
    pub fn spawn(name: impl Into<String>) -> Result<Self, DispatchError> {
        Self::builder().name(name).spawn()
    }

    /// Name of the dispatcher thread.
    pub fn thread_name(&self) -> Option<&str> {
        self.handle.as_ref().and_then(|h| h.thread().name())
    }
}

impl Dispatcher for ThreadDispatcher {
    fn dispatch(&self, task: Task) {
        let Some(tx) = &self.tx else { return };
        if tx.send(task).is_err() {
            tracing::trace!("dispatcher thread is gone, task dropped");
        }
    }
}

impl Drop for ThreadDispatcher {
    fn drop(&mut self) {
        drop(self.tx.take());
        let Some(handle) = self.handle.take() else { return };

        // The last owner may be a task running on the dispatcher thread.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::warn!("dispatcher thread panicked outside a task");
        }
    }
}

impl std::fmt::Debug for ThreadDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadDispatcher")
            .field("thread", &self.thread_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc as std_mpsc, Arc};
    use std::time::Duration;

    #[test]
    fn tasks_run_on_the_named_thread_in_order() {
        let dispatcher = ThreadDispatcher::spawn("vs-test-dispatch").unwrap();
        assert_eq!(dispatcher.thread_name(), Some("vs-test-dispatch"));

        let (tx, rx) = std_mpsc::channel();
        for n in 0..5 {
            let tx = tx.clone();
            dispatcher.dispatch(Box::new(move || {
                let name = thread::current().name().map(str::to_string);
                tx.send((n, name)).unwrap();
            }));
        }

        let seen: Vec<_> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        for (i, (n, name)) in seen.into_iter().enumerate() {
            assert_eq!(n, i);
            assert_eq!(name.as_deref(), Some("vs-test-dispatch"));
        }
    }

    #[test]
    fn drop_finishes_queued_tasks() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = ThreadDispatcher::builder().name("vs-drain").spawn().unwrap();
        for _ in 0..100 {
            let count = count.clone();
            dispatcher.dispatch(Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }
        drop(dispatcher);
        assert_eq!(count.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn survives_panicking_task() {
        let dispatcher = ThreadDispatcher::spawn("vs-panic").unwrap();
        let (tx, rx) = std_mpsc::channel();

        dispatcher.dispatch(Box::new(|| panic!("task failure")));
        dispatcher.dispatch(Box::new(move || tx.send(()).unwrap()));

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn store_reads_queued_behind_a_panic_still_run() {
        let dispatcher = Arc::new(ThreadDispatcher::spawn("vs-store-panic").unwrap());
        let store = crate::Store::new(0u32, dispatcher.clone());
        let (tx, rx) = std_mpsc::channel();

        store.get(|_| panic!("read failure"));
        store.get(move |n| tx.send(n).unwrap());

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).ok(), Some(0));
        assert_eq!(store.pending(), (0, 0));
    }

    #[test]
    fn builder_applies_stack_size() {
        let dispatcher = ThreadDispatcher::builder()
            .name("vs-small-stack")
            .stack_size(256 * 1024)
            .spawn()
            .unwrap();
        let (tx, rx) = std_mpsc::channel();

        dispatcher.dispatch(Box::new(move || {
            // Recurse a little to touch the configured stack.
            fn depth(n: u32) -> u32 {
                if n == 0 { 0 } else { 1 + depth(n - 1) }
            }
            tx.send(depth(1_000)).unwrap();
        }));

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).ok(), Some(1_000));
        assert_eq!(dispatcher.thread_name(), Some("vs-small-stack"));
    }
}
