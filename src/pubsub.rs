//! In-process fan-out of events to any number of subscribers.

use tokio::sync::broadcast;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast broker.
///
/// `publish` never awaits. A receiver that falls more than the channel
/// capacity behind sees `RecvError::Lagged` and loses the oldest events.
#[derive(Debug)]
pub struct Broker<T: Clone> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone> Broker<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to every live subscriber. Returns how many received it.
    pub fn publish(&self, event: T) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Receive everything published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone> Default for Broker<T> {
    fn default() -> Self {
        Self::new()
    }
}
