//! Event Bus for broadcasting published events to subscribers
//!
//! Uses tokio broadcast channel for pub/sub pattern.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::outbox::OutboxMessage;

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 1024;

/// Envelope of an event delivered to bus subscribers.
///
/// `id` is the outbox message id; a redelivered event keeps it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: Uuid,
    pub topic: String,
    pub event_type: String,
    pub aggregate_id: i64,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

impl EventMessage {
    pub fn from_outbox(topic: &str, message: &OutboxMessage) -> Self {
        Self {
            id: message.id,
            topic: topic.to_string(),
            event_type: message.event_type.clone(),
            aggregate_id: message.aggregate_id,
            payload: message.payload.clone(),
            published_at: Utc::now(),
        }
    }
}

/// Event bus for broadcasting events to all subscribers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it; 0 means nobody
    /// was listening and the event was dropped.
    pub fn publish(&self, message: EventMessage) -> usize {
        let event_type = message.event_type.clone();
        let aggregate_id = message.aggregate_id;

        match self.sender.send(message) {
            Ok(count) => {
                debug!(
                    "Event published: type={}, reservation={}, subscribers={}",
                    event_type, aggregate_id, count
                );
                count
            }
            Err(_) => {
                debug!(
                    "Event dropped (no subscribers): type={}, reservation={}",
                    event_type, aggregate_id
                );
                0
            }
        }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        self.subscriber_count.fetch_add(1, Ordering::SeqCst);
        let count = self.subscriber_count.load(Ordering::SeqCst);
        info!("New event subscriber, total: {}", count);

        EventSubscriber {
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    /// Get current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event subscriber that receives events from the bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    /// Receive the next event
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!("Subscriber lagged, {} events missed", count);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return None;
                }
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        let prev = self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
        info!("Event subscriber disconnected, remaining: {}", prev.saturating_sub(1));
    }
}

/// Shared event bus type
pub type SharedEventBus = Arc<EventBus>;

/// Create a shared event bus
pub fn create_event_bus(capacity: usize) -> SharedEventBus {
    Arc::new(EventBus::with_capacity(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::model::tests::sample_draft;
    use crate::domain::Reservation;

    fn sample_message() -> EventMessage {
        let now = Utc::now();
        let r = Reservation::from_draft(9, sample_draft(2, "2024-07-01", "2024-07-03"), now);
        let outbox = OutboxMessage::reservation_booked(&r, now, now).unwrap();
        EventMessage::from_outbox("reservation-events", &outbox)
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        assert_eq!(bus.publish(sample_message()), 1);

        let received = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            subscriber.recv(),
        )
        .await
        .expect("Timeout")
        .expect("No message");

        assert_eq!(received.aggregate_id, 9);
        assert_eq!(received.topic, "reservation-events");
    }

    #[test]
    fn test_publish_without_subscribers_reports_zero() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(sample_message()), 0);
    }

    #[test]
    fn test_subscriber_count() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(_sub1);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
