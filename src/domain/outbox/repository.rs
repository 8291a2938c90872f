//! Outbox repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{OutboxMessage, OutboxStats};
use crate::domain::DomainResult;

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Pending messages with `next_attempt_at <= now`, oldest first
    async fn find_due(&self, now: DateTime<Utc>, limit: u64) -> DomainResult<Vec<OutboxMessage>>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<OutboxMessage>>;

    /// Mark delivered. A message that is no longer pending is left as is.
    async fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()>;

    /// Record a failed delivery attempt.
    ///
    /// Increments `attempts`, stores `error` and reschedules to
    /// `next_attempt_at`; with `give_up` the message moves to `Failed`.
    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
        give_up: bool,
    ) -> DomainResult<()>;

    async fn stats(&self) -> DomainResult<OutboxStats>;
}
