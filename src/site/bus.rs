use std::sync::mpsc::{self, Receiver, Sender};

/// Typed publish/subscribe channel.
///
/// Every subscriber registered before a `publish` receives that event.
/// Nothing is replayed to later subscribers.
pub struct EventBus<E: Clone> {
    subscribers: Vec<Sender<E>>,
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Sends `event` to every live subscriber and forgets the ones whose
    /// receiver is gone. Returns the number of deliveries.
    pub fn publish(&mut self, event: E) -> usize {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
