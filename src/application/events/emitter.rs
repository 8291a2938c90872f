//! Fast-path emission of committed booking events
//!
//! The booking transaction already stored the outbox row; the emitter only
//! tries to deliver it right away so consumers do not wait for the next
//! dispatcher pass. Whatever happens here, the booking stands.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::dispatcher::{deliver, DeliveryOutcome};
use super::publisher::EventPublisher;
use crate::domain::outbox::OutboxMessage;
use crate::domain::RepositoryProvider;
use crate::shared::retry::RetryConfig;

#[derive(Clone)]
pub struct EventEmitter {
    repos: Arc<dyn RepositoryProvider>,
    publisher: Arc<dyn EventPublisher>,
    backoff: RetryConfig,
}

impl EventEmitter {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        publisher: Arc<dyn EventPublisher>,
        backoff: RetryConfig,
    ) -> Self {
        Self {
            repos,
            publisher,
            backoff,
        }
    }

    /// Spawn delivery of a just-committed booked event. Never blocks the
    /// caller; a failed attempt is left to the outbox dispatcher.
    pub fn emit_booked(&self, message: OutboxMessage) -> JoinHandle<()> {
        let repos = self.repos.clone();
        let publisher = self.publisher.clone();
        let backoff = self.backoff.clone();

        tokio::spawn(async move {
            match deliver(repos.as_ref(), publisher.as_ref(), &message, &backoff).await {
                Ok(DeliveryOutcome::Published) => {
                    debug!(event_id = %message.id, "Booked event delivered on fast path");
                }
                Ok(_) => {
                    debug!(event_id = %message.id, "Booked event left to the outbox dispatcher");
                }
                Err(e) => {
                    error!(
                        event_id = %message.id,
                        reservation_id = message.aggregate_id,
                        error = %e,
                        "Failed to record booked event delivery"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::dispatcher::tests::{immediate, FlakyPublisher};
    use crate::domain::outbox::OutboxStatus;
    use crate::domain::reservation::model::tests::sample_draft;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use chrono::Utc;

    #[tokio::test]
    async fn fast_path_marks_message_published() {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        let now = Utc::now();
        let (_, message) = repos
            .reservations()
            .insert_booked(sample_draft(1, "2024-07-01", "2024-07-03"), now, now)
            .await
            .unwrap();

        let emitter = EventEmitter::new(
            repos.clone(),
            Arc::new(FlakyPublisher::new(0)),
            immediate(3).backoff,
        );
        emitter.emit_booked(message.clone()).await.unwrap();

        let stored = repos.outbox().find_by_id(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Published);
    }

    #[tokio::test]
    async fn fast_path_failure_keeps_message_pending() {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        let now = Utc::now();
        let (_, message) = repos
            .reservations()
            .insert_booked(sample_draft(1, "2024-07-01", "2024-07-03"), now, now)
            .await
            .unwrap();

        let emitter = EventEmitter::new(
            repos.clone(),
            Arc::new(FlakyPublisher::new(1)),
            immediate(3).backoff,
        );
        emitter.emit_booked(message.clone()).await.unwrap();

        let stored = repos.outbox().find_by_id(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Pending);
        assert_eq!(stored.attempts, 1);
    }
}
