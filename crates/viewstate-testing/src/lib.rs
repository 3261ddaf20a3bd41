//! Testing utilities for viewstate stores.
//!
//! [`TestStore`] pairs a [`Store`] with a [`ManualDispatcher`] and a
//! [`Recorder`], so a test can queue jobs, run the flush loop when it
//! chooses, and assert on exactly what subscribers saw.
//!
//! ```ignore
//! let mut t = TestStore::new(Counter::default());
//! t.store().set(|mut s| { s.count += 1; s });
//! t.store().set(|mut s| { s.count += 1; s });
//! t.settle();
//! assert_eq!(t.emitted(), &[Counter { count: 0 }, Counter { count: 2 }]);
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use viewstate_core::{ManualDispatcher, StateStream, Store, StoreStats};

/// Collects every state a subscriber received.
#[derive(Debug)]
pub struct Recorder<S> {
    stream: StateStream<S>,
    seen: Vec<S>,
}

impl<S> Recorder<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn subscribe(store: &Store<S>) -> Self {
        Self {
            stream: store.observable(),
            seen: Vec::new(),
        }
    }

    /// Pulls in states delivered since the last call and returns only those.
    pub fn take_new(&mut self) -> Vec<S> {
        let fresh = self.stream.drain_ready();
        self.seen.extend(fresh.iter().cloned());
        fresh
    }

    /// Everything recorded so far, oldest first.
    pub fn all(&mut self) -> &[S] {
        self.take_new();
        &self.seen
    }

    pub fn last(&mut self) -> Option<&S> {
        self.all().last()
    }

    /// True once the store was disposed and nothing is left to read.
    pub fn is_finished(&self) -> bool {
        self.stream.is_closed()
    }
}

/// A store driven by hand.
pub struct TestStore<S> {
    store: Store<S>,
    dispatcher: ManualDispatcher,
    recorder: Recorder<S>,
}

impl<S> TestStore<S>
where
    S: Clone + PartialEq + Debug + Send + Sync + 'static,
{
    pub fn new(initial: S) -> Self {
        let dispatcher = ManualDispatcher::new();
        let store = Store::new(initial, dispatcher.clone());
        let recorder = Recorder::subscribe(&store);
        Self {
            store,
            dispatcher,
            recorder,
        }
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn dispatcher(&self) -> &ManualDispatcher {
        &self.dispatcher
    }

    /// Runs queued flushes until idle. Returns the states published meanwhile.
    pub fn settle(&mut self) -> Vec<S> {
        self.dispatcher.run_until_idle();
        self.recorder.take_new()
    }

    /// Everything published since construction, starting with the initial state.
    pub fn emitted(&mut self) -> &[S] {
        self.recorder.all()
    }

    /// Queues a read, settles, and returns what the read observed.
    pub fn read(&mut self) -> S {
        let slot = Arc::new(Mutex::new(None));
        let out = slot.clone();
        self.store.get(move |state| *out.lock() = Some(state));
        self.settle();

        let observed = slot.lock().take();
        match observed {
            Some(state) => state,
            None => panic!("read was not serviced; is the store disposed?"),
        }
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Asserts the states published since the last settle/assert.
    #[track_caller]
    pub fn assert_published(&mut self, expected: &[S]) {
        self.dispatcher.run_until_idle();
        let fresh = self.recorder.take_new();
        assert_eq!(fresh, expected, "unexpected published states");
    }
}

/// Collects every item a projection stream has ready right now.
pub fn ready_items<St>(stream: &mut St) -> Vec<St::Item>
where
    St: Stream + Unpin,
{
    use futures::{FutureExt, StreamExt};

    let mut items = Vec::new();
    while let Some(Some(item)) = stream.next().now_or_never() {
        items.push(item);
    }
    items
}
