//! The current state plus its distinct-value publisher.

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::stream::StateStream;

struct Subscribers<S> {
    senders: Vec<mpsc::UnboundedSender<S>>,
    closed: bool,
}

/// Holds the latest published state and fans it out to subscribers.
///
/// `publish` is only ever called from the flush loop, so `current` has a
/// single writer. Other threads read it through the `RwLock`.
///
/// Lock order is `subscribers` then `current`. Subscribing and publishing both
/// hold `subscribers`, which is what keeps a new subscriber from missing or
/// seeing twice the state published while it registers.
pub(crate) struct StateCell<S> {
    current: RwLock<S>,
    subscribers: Mutex<Subscribers<S>>,
}

impl<S> StateCell<S>
where
    S: Clone + PartialEq,
{
    pub(crate) fn new(initial: S) -> Self {
        Self {
            current: RwLock::new(initial),
            subscribers: Mutex::new(Subscribers {
                senders: Vec::new(),
                closed: false,
            }),
        }
    }

    pub(crate) fn current(&self) -> S {
        self.current.read().clone()
    }

    /// Replaces the current state and notifies subscribers, unless `next`
    /// equals the current state.
    ///
    /// Returns whether anything was published.
    pub(crate) fn publish(&self, next: S) -> bool {
        let mut subscribers = self.subscribers.lock();
        if *self.current.read() == next {
            return false;
        }

        *self.current.write() = next.clone();
        if !subscribers.closed {
            subscribers
                .senders
                .retain(|sender| sender.send(next.clone()).is_ok());
        }
        true
    }

    pub(crate) fn subscribe(&self) -> StateStream<S> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock();

        // Receiver is alive, the send cannot fail.
        let _ = tx.send(self.current());
        if !subscribers.closed {
            subscribers.senders.push(tx);
        }
        StateStream::new(rx)
    }

    /// Ends every subscriber stream. Later subscribers get the final state
    /// and an immediately finished stream.
    pub(crate) fn close(&self) {
        let senders = {
            let mut subscribers = self.subscribers.lock();
            subscribers.closed = true;
            std::mem::take(&mut subscribers.senders)
        };
        drop(senders);
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.senders.retain(|sender| !sender.is_closed());
        subscribers.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_emission_is_initial_state() {
        let cell = StateCell::new(1);
        let mut stream = cell.subscribe();
        assert_eq!(stream.drain_ready(), vec![1]);
    }

    #[test]
    fn equal_state_is_not_published() {
        let cell = StateCell::new(1);
        let mut stream = cell.subscribe();

        assert!(!cell.publish(1));
        assert!(cell.publish(2));
        assert!(!cell.publish(2));
        assert!(cell.publish(1));

        assert_eq!(stream.drain_ready(), vec![1, 2, 1]);
        assert_eq!(cell.current(), 1);
    }

    #[test]
    fn late_subscriber_starts_from_latest_state() {
        let cell = StateCell::new("a".to_string());
        cell.publish("b".to_string());

        let mut stream = cell.subscribe();
        cell.publish("c".to_string());

        assert_eq!(stream.drain_ready(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let cell = StateCell::new(0);
        let keep = cell.subscribe();
        let gone = cell.subscribe();
        assert_eq!(cell.subscriber_count(), 2);

        drop(gone);
        cell.publish(1);
        assert_eq!(cell.subscriber_count(), 1);
        drop(keep);
    }

    #[test]
    fn close_ends_streams() {
        let cell = StateCell::new(0);
        let mut before = cell.subscribe();
        cell.publish(1);
        cell.close();

        assert!(before.is_closed());
        assert_eq!(before.drain_ready(), vec![0, 1]);

        cell.publish(2);
        let mut after = cell.subscribe();
        assert!(after.is_closed());
        assert_eq!(after.drain_ready(), vec![2]);
        assert_eq!(cell.subscriber_count(), 0);
    }
}
