use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::{run_isolated, Dispatcher, Task};
use crate::error::DispatchError;

/// Runs tasks on a single tokio task.
///
/// Tasks are synchronous closures, so one worker task polling an unbounded
/// channel is enough to keep them serial. The worker stops once every clone
/// of the dispatcher is dropped. Keep dispatched work short: it occupies a
/// runtime worker thread while it runs.
#[derive(Clone, Debug)]
pub struct TokioDispatcher {
    tx: mpsc::UnboundedSender<Task>,
}

impl TokioDispatcher {
    /// Spawns the worker on the runtime the caller is running in.
    pub fn new() -> Result<Self, DispatchError> {
        let handle = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        Ok(Self::with_handle(&handle))
    }

    /// Spawns the worker on an explicit runtime.
    pub fn with_handle(handle: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        handle.spawn(async move {
            while let Some(task) = rx.recv().await {
                run_isolated("tokio", task);
            }
            tracing::trace!("tokio dispatcher stopped");
        });
        Self { tx }
    }
}

impl Dispatcher for TokioDispatcher {
    fn dispatch(&self, task: Task) {
        // The worker only exits after all senders are gone, or when the
        // runtime shuts down. In both cases the task can be dropped.
        if self.tx.send(task).is_err() {
            tracing::trace!("tokio dispatcher is gone, task dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[test]
    fn new_outside_runtime_fails() {
        assert!(matches!(TokioDispatcher::new(), Err(DispatchError::NoRuntime)));
    }

    #[tokio::test]
    async fn runs_tasks_in_order() {
        let dispatcher = TokioDispatcher::new().unwrap();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for n in 0..10 {
            let log = log.clone();
            dispatcher.dispatch(Box::new(move || log.lock().push(n)));
        }
        let (done_tx, done_rx) = oneshot::channel();
        dispatcher.dispatch(Box::new(move || {
            let _ = done_tx.send(());
        }));

        tokio::time::timeout(Duration::from_secs(5), done_rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*log.lock(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn survives_panicking_task() {
        let dispatcher = TokioDispatcher::new().unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        dispatcher.dispatch(Box::new(|| panic!("task failure")));
        let c = count.clone();
        let (done_tx, done_rx) = oneshot::channel();
        dispatcher.dispatch(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
            let _ = done_tx.send(());
        }));

        tokio::time::timeout(Duration::from_secs(5), done_rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
