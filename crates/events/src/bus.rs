//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the fan-out hub for persisted [`EquipmentEvent`]s. The
//! intake workers publish every event here after a successful insert; the
//! alert engine and the WebSocket bridge consume independently. It is
//! designed to be shared via `Arc<EventBus>` across the application.

use tokio::sync::broadcast;

use fieldwatch_core::event::EquipmentEvent;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published event. Delivery is best-effort:
/// publishing never fails, and a slow subscriber that falls more than the
/// buffer capacity behind observes `RecvError::Lagged` rather than stalling
/// the publisher.
pub struct EventBus {
    sender: broadcast::Sender<EquipmentEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a persisted event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped —
    /// the event is already durable in the store, and offline subscribers
    /// reconcile through the query API.
    pub fn publish(&self, event: EquipmentEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<EquipmentEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
