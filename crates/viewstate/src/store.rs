//! The public store handle.

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::cell::StateCell;
use crate::dispatch::{Dispatcher, TokioDispatcher};
use crate::error::StoreError;
use crate::flush;
use crate::queue::JobQueue;
use crate::stats::{Counters, StoreStats};
use crate::stream::StateStream;
use crate::trigger::Trigger;

const DEFAULT_NAME: &str = "store";

/// Identifies a store in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(Uuid);

impl StoreId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// State shared between store handles and the flush task.
pub(crate) struct Shared<S> {
    pub(crate) id: StoreId,
    pub(crate) name: Arc<str>,
    pub(crate) queue: JobQueue<S>,
    pub(crate) cell: StateCell<S>,
    pub(crate) trigger: Trigger,
    pub(crate) counters: Counters,
}

impl<S> Shared<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    fn after_enqueue(&self) {
        // dispose() sets the flag before clearing the queue. Checking it
        // after our push means either dispose's clear saw the job or we
        // clear it here. Either way it never runs.
        if self.trigger.is_disposed() {
            let discarded = self.queue.clear();
            self.counters.record_discarded(discarded);
            return;
        }
        if !self.trigger.signal() {
            tracing::trace!(store = %self.name, "flush already scheduled");
        }
    }

    fn reject_if_disposed(&self, kind: &'static str) -> bool {
        if self.trigger.is_disposed() {
            self.counters.record_discarded(1);
            tracing::trace!(store = %self.name, kind, "store disposed, job dropped");
            return true;
        }
        false
    }
}

/// A concurrent, observable state container.
///
/// Writes ([`set`](Self::set), [`update`](Self::update)) and reads
/// ([`get`](Self::get)) may come from any thread. They are queued and
/// applied on the store's [`Dispatcher`] in one total order:
///
/// - writes apply in the order their enqueue acquired the queue lock, so two
///   writes racing from different threads are ordered by lock acquisition;
/// - a read sees every write enqueued before it;
/// - writes queued between two flushes are folded into a single emission;
/// - subscribers only see states that differ from the previous one.
///
/// `Store` is a cheap handle; clones share the same state.
pub struct Store<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S> Store<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    /// Creates a store whose flushes run on `dispatcher`.
    pub fn new<D: Dispatcher>(initial: S, dispatcher: D) -> Self {
        Self::from_parts(initial, DEFAULT_NAME.into(), Arc::new(dispatcher))
    }

    pub fn builder(initial: S) -> StoreBuilder<S> {
        StoreBuilder::new(initial)
    }

    fn from_parts(initial: S, name: Arc<str>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<Shared<S>>| {
            let weak = weak.clone();
            let flush_task: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    flush::run(&shared);
                }
            });

            Shared {
                id: StoreId::new(),
                name,
                queue: JobQueue::new(),
                cell: StateCell::new(initial),
                trigger: Trigger::new(dispatcher, flush_task),
                counters: Counters::default(),
            }
        });

        tracing::debug!(store = %shared.name, store_id = %shared.id, "store created");
        Self { shared }
    }

    /// Queues a write. `reducer` receives the state left by every earlier
    /// write and returns the next state.
    pub fn set<F>(&self, reducer: F)
    where
        F: FnOnce(S) -> S + Send + 'static,
    {
        if self.shared.reject_if_disposed("write") {
            return;
        }
        self.shared.queue.enqueue_write(Box::new(reducer));
        self.shared.after_enqueue();
    }

    /// Queues a write that edits the state in place.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.set(move |mut state| {
            f(&mut state);
            state
        });
    }

    /// Queues a read. `callback` runs exactly once on the dispatcher with
    /// the state produced by every write enqueued before this call.
    ///
    /// Calling [`set`](Self::set) from inside the callback is fine: that
    /// write is applied before the next queued read runs.
    pub fn get<F>(&self, callback: F)
    where
        F: FnOnce(S) + Send + 'static,
    {
        if self.shared.reject_if_disposed("read") {
            return;
        }
        self.shared.queue.enqueue_read(Box::new(callback));
        self.shared.after_enqueue();
    }

    /// Awaitable form of [`get`](Self::get), ordered the same way.
    pub async fn snapshot(&self) -> Result<S, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.get(move |state| {
            let _ = tx.send(state);
        });
        rx.await.map_err(|_| StoreError::Disposed)
    }

    /// The latest published state, without waiting for queued writes.
    pub fn current(&self) -> S {
        self.shared.cell.current()
    }

    /// Subscribes to distinct states, starting with the current one.
    pub fn observable(&self) -> StateStream<S> {
        self.shared.cell.subscribe()
    }

    /// Stops the store. Queued jobs are dropped without running, later jobs
    /// are ignored, and every [`StateStream`] ends. Calling it again is a
    /// no-op.
    pub fn dispose(&self) {
        if !self.shared.trigger.dispose() {
            return;
        }
        let discarded = self.shared.queue.clear();
        self.shared.counters.record_discarded(discarded);
        self.shared.cell.close();
        tracing::debug!(
            store = %self.shared.name,
            store_id = %self.shared.id,
            discarded,
            "store disposed"
        );
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.trigger.is_disposed()
    }

    pub fn id(&self) -> StoreId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn stats(&self) -> StoreStats {
        self.shared.counters.snapshot()
    }

    /// Number of `(writes, reads)` waiting for the next flush.
    pub fn pending(&self) -> (usize, usize) {
        self.shared.queue.pending()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.cell.subscriber_count()
    }
}

impl<S> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.shared.name)
            .field("id", &self.shared.id)
            .field("disposed", &self.shared.trigger.is_disposed())
            .finish()
    }
}

enum DispatcherChoice {
    Unset,
    Given(Arc<dyn Dispatcher>),
    CurrentRuntime,
}

/// Builder for a [`Store`].
///
/// ```ignore
/// let store = Store::builder(Counter::default())
///     .name("counter")
///     .on_current_runtime()
///     .build()?;
/// ```
pub struct StoreBuilder<S> {
    initial: S,
    name: Option<String>,
    dispatcher: DispatcherChoice,
}

impl<S> StoreBuilder<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: S) -> Self {
        Self {
            initial,
            name: None,
            dispatcher: DispatcherChoice::Unset,
        }
    }

    /// Name used in log fields.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn dispatcher<D: Dispatcher>(mut self, dispatcher: D) -> Self {
        self.dispatcher = DispatcherChoice::Given(Arc::new(dispatcher));
        self
    }

    pub fn shared_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = DispatcherChoice::Given(dispatcher);
        self
    }

    /// Flush on a [`TokioDispatcher`] spawned on the runtime that calls
    /// [`build`](Self::build).
    pub fn on_current_runtime(mut self) -> Self {
        self.dispatcher = DispatcherChoice::CurrentRuntime;
        self
    }

    pub fn build(self) -> Result<Store<S>, StoreError> {
        let dispatcher: Arc<dyn Dispatcher> = match self.dispatcher {
            DispatcherChoice::Unset => return Err(StoreError::MissingDispatcher),
            DispatcherChoice::Given(dispatcher) => dispatcher,
            DispatcherChoice::CurrentRuntime => Arc::new(TokioDispatcher::new()?),
        };
        let name: Arc<str> = self.name.as_deref().unwrap_or(DEFAULT_NAME).into();
        Ok(Store::from_parts(self.initial, name, dispatcher))
    }
}
