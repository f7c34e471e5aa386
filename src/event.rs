//! Event-driven communication system for inter-service messaging.

use anyhow::Result;
use tokio::sync::broadcast;

use crate::status::StatusReport;

/// Application events for inter-service communication.
///
/// Events are published through the EventBus and consumed by interested services.
#[derive(Debug, Clone)]
pub enum Event {
    /// A status report was installed into the shared state.
    StatusUpdated(StatusReport),
    /// An external controller asked the daemon to stop.
    ShutdownRequested,
}

/// Event bus for publish-subscribe messaging between services.
///
/// # Example
///
/// ```no_run
/// use fridged::event::{Event, EventBus};
///
/// let event_bus = EventBus::new();
/// let mut subscriber = event_bus.subscribe();
///
/// event_bus.publish(Event::ShutdownRequested).unwrap();
///
/// // In async context, receive events:
/// // let event = subscriber.recv().await;
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new EventBus with default capacity.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    #[cfg(test)]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns an error if there are no active subscribers.
    pub fn publish(&self, event: Event) -> Result<()> {
        self.sender.send(event)?;
        Ok(())
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each subscriber receives all events published after subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Settings;
    use pretty_assertions::assert_eq;

    #[test]
    fn event_bus_clone_creates_shared_channel() {
        let event_bus1 = EventBus::new();
        let event_bus2 = event_bus1.clone();

        let _receiver1 = event_bus1.subscribe();
        let _receiver2 = event_bus2.subscribe();

        assert_eq!(event_bus1.sender.receiver_count(), 2);
        assert!(event_bus2.has_subscribers());
    }

    #[tokio::test]
    async fn publish_status_updated_event() {
        let event_bus = EventBus::new();
        let mut receiver = event_bus.subscribe();

        let report = StatusReport::new(Settings::default().with_on(true), 4.0);
        event_bus.publish(Event::StatusUpdated(report)).unwrap();

        match receiver.recv().await.unwrap() {
            Event::StatusUpdated(received) => assert_eq!(received, report),
            other => panic!("Expected StatusUpdated event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_returns_error() {
        let event_bus = EventBus::with_capacity(4);

        assert!(!event_bus.has_subscribers());
        assert!(event_bus.publish(Event::ShutdownRequested).is_err());
    }

    #[tokio::test]
    async fn sequential_events_received_in_order() {
        let event_bus = EventBus::new();
        let mut receiver = event_bus.subscribe();

        let report = StatusReport::default();
        event_bus.publish(Event::StatusUpdated(report)).unwrap();
        event_bus.publish(Event::ShutdownRequested).unwrap();

        match (receiver.recv().await.unwrap(), receiver.recv().await.unwrap()) {
            (Event::StatusUpdated(_), Event::ShutdownRequested) => {}
            _ => panic!("Events should be received in publication order"),
        }
    }
}
