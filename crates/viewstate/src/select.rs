//! Projections over a store's state stream.
//!
//! View code rarely wants the whole state. These adapters narrow a
//! [`StateStream`] to the part a view renders and drop repeats, so a view
//! only wakes when its slice actually changed.

use futures::future;
use futures::{Stream, StreamExt};

use crate::store::Store;
use crate::stream::StateStream;

impl<S> StateStream<S>
where
    S: Send + 'static,
{
    /// Maps every state through `extractor` and skips values equal to the
    /// previous one.
    pub fn select<T, F>(self, mut extractor: F) -> impl Stream<Item = T> + Send + Unpin + 'static
    where
        F: FnMut(&S) -> T + Send + 'static,
        T: Clone + PartialEq + Send + 'static,
    {
        let mut last: Option<T> = None;
        self.filter_map(move |state| {
            let value = extractor(&state);
            let changed = last.as_ref() != Some(&value);
            if changed {
                last = Some(value.clone());
            }
            future::ready(changed.then_some(value))
        })
    }

    /// Yields the whole state, but only when `key` of it changed.
    pub fn select_state<K, F>(self, mut key: F) -> impl Stream<Item = S> + Send + Unpin + 'static
    where
        F: FnMut(&S) -> K + Send + 'static,
        K: PartialEq + Send + 'static,
    {
        let mut last: Option<K> = None;
        self.filter_map(move |state| {
            let next = key(&state);
            let changed = last.as_ref() != Some(&next);
            if changed {
                last = Some(next);
            }
            future::ready(changed.then_some(state))
        })
    }
}

impl<S> Store<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    /// Shorthand for `self.observable().select(extractor)`.
    pub fn select<T, F>(&self, extractor: F) -> impl Stream<Item = T> + Send + Unpin + 'static
    where
        F: FnMut(&S) -> T + Send + 'static,
        T: Clone + PartialEq + Send + 'static,
    {
        self.observable().select(extractor)
    }

    /// Shorthand for `self.observable().select_state(key)`.
    pub fn select_state<K, F>(&self, key: F) -> impl Stream<Item = S> + Send + Unpin + 'static
    where
        F: FnMut(&S) -> K + Send + 'static,
        K: PartialEq + Send + 'static,
    {
        self.observable().select_state(key)
    }
}

/// A type that owns a store, typically a view-model.
///
/// Implementors get projection helpers for free.
pub trait ViewModel {
    type State: Clone + PartialEq + Send + Sync + 'static;

    fn store(&self) -> &Store<Self::State>;

    /// Distinct values of one slice of the state.
    fn state_of<T, F>(&self, extractor: F) -> impl Stream<Item = T> + Send + Unpin + 'static
    where
        F: FnMut(&Self::State) -> T + Send + 'static,
        T: Clone + PartialEq + Send + 'static,
    {
        self.store().select(extractor)
    }

    /// The full state each time `key` of it changes.
    fn state_when<K, F>(&self, key: F) -> impl Stream<Item = Self::State> + Send + Unpin + 'static
    where
        F: FnMut(&Self::State) -> K + Send + 'static,
        K: PartialEq + Send + 'static,
    {
        self.store().select_state(key)
    }
}
