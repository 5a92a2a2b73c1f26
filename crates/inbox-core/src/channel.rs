use tokio::sync::broadcast;

/// Broadcast event stream type used by rendering-layer subscribers.
pub type EventStream<E> = broadcast::Receiver<E>;

/// Publish/subscribe hub for one session's state events.
#[derive(Debug)]
pub struct EventHub<E> {
    event_tx: broadcast::Sender<E>,
}

impl<E> Clone for EventHub<E> {
    fn clone(&self) -> Self {
        Self {
            event_tx: self.event_tx.clone(),
        }
    }
}

impl<E: Clone> EventHub<E> {
    /// Create a hub buffering up to `event_buffer` events per subscriber.
    pub fn new(event_buffer: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_buffer.max(1));
        Self { event_tx }
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> EventStream<E> {
        self.event_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }

    /// Emit an event to all subscribers.
    ///
    /// Emission is best-effort; with no subscribers the event is dropped and
    /// lagged subscribers are handled by `broadcast`.
    pub fn emit(&self, event: E) {
        let _ = self.event_tx.send(event);
    }

    /// Emit several events in order.
    pub fn emit_all<I>(&self, events: I)
    where
        I: IntoIterator<Item = E>,
    {
        for event in events {
            self.emit(event);
        }
    }
}
