//! Outbox dispatcher
//!
//! Background task that periodically drains due outbox messages through
//! the configured publisher. Failed deliveries are rescheduled with
//! exponential backoff until `max_attempts`, after which the message is
//! parked as `Failed`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::publisher::EventPublisher;
use crate::domain::outbox::OutboxMessage;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::retry::{retry_with_backoff, RetryConfig};
use crate::shared::shutdown::ShutdownSignal;

/// Dispatcher tuning
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub poll_interval: Duration,
    pub batch_size: u64,
    /// `max_attempts` is the number of deliveries tried before a message
    /// is dead-lettered; the delays space out redeliveries.
    pub backoff: RetryConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 50,
            backoff: RetryConfig {
                max_attempts: 8,
                initial_delay: Duration::from_secs(1),
                backoff_multiplier: 2.0,
                max_delay: Duration::from_secs(300),
            },
        }
    }
}

/// Result of handing one message to the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Published,
    Rescheduled,
    DeadLettered,
}

/// Counts from one dispatch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub published: usize,
    pub failed: usize,
    pub dead_lettered: usize,
    /// Messages whose outcome could not be recorded; they stay due
    pub errors: usize,
}

/// Publish one message and record the outcome in the outbox.
///
/// A publish failure is not an error here: it is counted, logged and
/// stored on the message. Only storage failures are returned.
pub async fn deliver(
    repos: &dyn RepositoryProvider,
    publisher: &dyn EventPublisher,
    message: &OutboxMessage,
    backoff: &RetryConfig,
) -> DomainResult<DeliveryOutcome> {
    let id = message.id;

    match publisher.publish(message).await {
        Ok(()) => {
            metrics::counter!(
                "reservation_events_published_total",
                "publisher" => publisher.name()
            )
            .increment(1);

            retry_with_backoff(
                backoff.clone(),
                move || repos.outbox().mark_published(id, Utc::now()),
                DomainError::is_transient,
                "outbox_mark_published",
            )
            .await?;

            debug!(event_id = %id, reservation_id = message.aggregate_id, "Event delivered");
            Ok(DeliveryOutcome::Published)
        }
        Err(e) => {
            let attempt = u32::try_from(message.attempts).unwrap_or(0) + 1;
            let give_up = attempt >= backoff.max_attempts;
            let delay = chrono::Duration::from_std(backoff.delay_after(attempt))
                .unwrap_or_else(|_| chrono::Duration::zero());
            let error = e.to_string();

            metrics::counter!(
                "reservation_events_failed_total",
                "publisher" => publisher.name()
            )
            .increment(1);

            if give_up {
                warn!(
                    event_id = %id,
                    reservation_id = message.aggregate_id,
                    attempt,
                    error = %error,
                    "Event delivery abandoned, message dead-lettered"
                );
            } else {
                warn!(
                    event_id = %id,
                    reservation_id = message.aggregate_id,
                    attempt,
                    retry_in_ms = delay.num_milliseconds(),
                    error = %error,
                    "Event delivery failed, will retry"
                );
            }

            repos
                .outbox()
                .record_failure(id, &error, Utc::now() + delay, give_up)
                .await?;

            Ok(if give_up {
                DeliveryOutcome::DeadLettered
            } else {
                DeliveryOutcome::Rescheduled
            })
        }
    }
}

pub struct OutboxDispatcher {
    repos: Arc<dyn RepositoryProvider>,
    publisher: Arc<dyn EventPublisher>,
    config: DispatcherConfig,
}

impl OutboxDispatcher {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        publisher: Arc<dyn EventPublisher>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            repos,
            publisher,
            config,
        }
    }

    /// Deliver one batch of due messages.
    ///
    /// A storage failure on one message is logged and counted, and the
    /// rest of the batch is still delivered.
    pub async fn dispatch_due(&self) -> DomainResult<DispatchReport> {
        let due = self
            .repos
            .outbox()
            .find_due(Utc::now(), self.config.batch_size)
            .await?;

        let mut report = DispatchReport::default();
        for message in &due {
            let outcome = deliver(
                self.repos.as_ref(),
                self.publisher.as_ref(),
                message,
                &self.config.backoff,
            )
            .await;

            match outcome {
                Ok(DeliveryOutcome::Published) => report.published += 1,
                Ok(DeliveryOutcome::Rescheduled) => report.failed += 1,
                Ok(DeliveryOutcome::DeadLettered) => report.dead_lettered += 1,
                Err(e) => {
                    error!(
                        event_id = %message.id,
                        reservation_id = message.aggregate_id,
                        error = %e,
                        "Could not record delivery outcome"
                    );
                    report.errors += 1;
                }
            }
        }

        if !due.is_empty() {
            info!(
                published = report.published,
                failed = report.failed,
                dead_lettered = report.dead_lettered,
                errors = report.errors,
                "Outbox dispatch pass finished"
            );
        }
        Ok(report)
    }

    /// Run the dispatcher until `shutdown` fires.
    pub fn start(self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                poll_interval_ms = self.config.poll_interval.as_millis() as u64,
                batch_size = self.config.batch_size,
                publisher = self.publisher.name(),
                "📨 Outbox dispatcher started"
            );

            let mut interval = tokio::time::interval(self.config.poll_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.dispatch_due().await {
                            warn!(error = %e, "Outbox dispatch pass error");
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("📨 Outbox dispatcher shutting down");
                        break;
                    }
                }
            }

            info!("📨 Outbox dispatcher stopped");
        })
    }
}
