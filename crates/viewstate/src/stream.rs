//! The subscriber side of a store.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

/// Stream of distinct states published by a store.
///
/// Starts with the state current at subscription time, then yields every
/// later distinct state in publish order. Each subscriber has its own
/// unbounded buffer, so a slow consumer never loses a transition. The stream
/// ends once the store is disposed and the buffered states are consumed.
pub struct StateStream<S> {
    rx: mpsc::UnboundedReceiver<S>,
}

impl<S> StateStream<S> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<S>) -> Self {
        Self { rx }
    }

    /// Takes every state already delivered to this subscriber without waiting.
    ///
    /// Handy with a manual dispatcher, where publishing happens synchronously
    /// on the test thread.
    pub fn drain_ready(&mut self) -> Vec<S> {
        let mut ready = Vec::new();
        while let Ok(state) = self.rx.try_recv() {
            ready.push(state);
        }
        ready
    }

    /// Returns true once the store closed this stream.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

impl<S> Stream for StateStream<S> {
    type Item = S;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S>> {
        self.rx.poll_recv(cx)
    }
}

impl<S> std::fmt::Debug for StateStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStream")
            .field("buffered", &self.rx.len())
            .field("closed", &self.rx.is_closed())
            .finish()
    }
}
