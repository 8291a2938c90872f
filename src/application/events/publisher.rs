//! Event publishers
//!
//! The outbox hands each message to one `EventPublisher`. A failed publish
//! leaves the message pending for redelivery.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::event_bus::{EventMessage, SharedEventBus};
use crate::domain::outbox::OutboxMessage;

/// Why an event could not be handed off
#[derive(Debug, Error)]
pub enum EmissionError {
    #[error("no subscribers attached to topic '{0}'")]
    NoSubscribers(String),

    #[error("publisher {publisher} failed: {message}")]
    Publisher {
        publisher: &'static str,
        message: String,
    },
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn publish(&self, message: &OutboxMessage) -> Result<(), EmissionError>;
}

/// Which publisher the service delivers through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    /// Structured log line per event
    #[default]
    Log,
    /// In-process broadcast bus, streamed to WebSocket consumers
    Bus,
}

/// Writes each event as a structured tracing line. Never fails.
pub struct LogPublisher {
    topic: String,
}

impl LogPublisher {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for LogPublisher {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn publish(&self, message: &OutboxMessage) -> Result<(), EmissionError> {
        info!(
            target: "reservation_events",
            topic = %self.topic,
            event_id = %message.id,
            event_type = %message.event_type,
            reservation_id = message.aggregate_id,
            payload = %message.payload,
            "Reservation event published"
        );
        Ok(())
    }
}

/// Broadcasts events on the in-process bus. Without subscribers the
/// publish fails, so the message waits for a consumer to attach.
pub struct BusPublisher {
    bus: SharedEventBus,
    topic: String,
}

impl BusPublisher {
    pub fn new(bus: SharedEventBus, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for BusPublisher {
    fn name(&self) -> &'static str {
        "bus"
    }

    async fn publish(&self, message: &OutboxMessage) -> Result<(), EmissionError> {
        let delivered = self
            .bus
            .publish(EventMessage::from_outbox(&self.topic, message));
        if delivered == 0 {
            return Err(EmissionError::NoSubscribers(self.topic.clone()));
        }
        Ok(())
    }
}

pub fn create_publisher(
    kind: PublisherKind,
    topic: &str,
    bus: SharedEventBus,
) -> Arc<dyn EventPublisher> {
    match kind {
        PublisherKind::Log => Arc::new(LogPublisher::new(topic)),
        PublisherKind::Bus => Arc::new(BusPublisher::new(bus, topic)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::event_bus::create_event_bus;
    use crate::domain::reservation::model::tests::sample_draft;
    use crate::domain::Reservation;
    use chrono::Utc;

    fn booked() -> OutboxMessage {
        let now = Utc::now();
        let r = Reservation::from_draft(3, sample_draft(1, "2024-07-01", "2024-07-03"), now);
        OutboxMessage::reservation_booked(&r, now, now).unwrap()
    }

    #[tokio::test]
    async fn bus_publisher_needs_a_subscriber() {
        let bus = create_event_bus(16);
        let publisher = create_publisher(PublisherKind::Bus, "reservation-events", bus.clone());
        assert_eq!(publisher.name(), "bus");

        let err = publisher.publish(&booked()).await.unwrap_err();
        assert!(matches!(err, EmissionError::NoSubscribers(_)));

        let mut sub = bus.subscribe();
        publisher.publish(&booked()).await.unwrap();
        let received = sub.recv().await.unwrap();
        assert_eq!(received.aggregate_id, 3);
    }

    #[tokio::test]
    async fn log_publisher_always_succeeds() {
        let publisher = create_publisher(PublisherKind::Log, "reservation-events", create_event_bus(1));
        assert!(publisher.publish(&booked()).await.is_ok());
    }
}
