//! SeaORM implementation of OutboxRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, UpdateResult,
};
use uuid::Uuid;

use crate::domain::outbox::{OutboxMessage, OutboxRepository, OutboxStats, OutboxStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::outbox_message;

use super::db_err;

pub struct SeaOrmOutboxRepository {
    db: DatabaseConnection,
}

impl SeaOrmOutboxRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn count_with_status(&self, status: OutboxStatus) -> DomainResult<u64> {
        outbox_message::Entity::find()
            .filter(outbox_message::Column::Status.eq(status.as_str()))
            .count(&self.db)
            .await
            .map_err(db_err)
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn domain_to_active(m: &OutboxMessage) -> outbox_message::ActiveModel {
    outbox_message::ActiveModel {
        id: Set(m.id.to_string()),
        event_type: Set(m.event_type.clone()),
        aggregate_id: Set(m.aggregate_id),
        payload: Set(m.payload.to_string()),
        status: Set(m.status.as_str().to_string()),
        attempts: Set(m.attempts),
        last_error: Set(m.last_error.clone()),
        created_at: Set(m.created_at),
        next_attempt_at: Set(m.next_attempt_at),
        published_at: Set(m.published_at),
    }
}

fn model_to_domain(m: outbox_message::Model) -> DomainResult<OutboxMessage> {
    let id = Uuid::parse_str(&m.id)
        .map_err(|e| DomainError::Storage(format!("invalid outbox id '{}': {}", m.id, e)))?;
    let payload = serde_json::from_str(&m.payload)
        .map_err(|e| DomainError::Storage(format!("invalid outbox payload {}: {}", m.id, e)))?;

    Ok(OutboxMessage {
        id,
        event_type: m.event_type,
        aggregate_id: m.aggregate_id,
        payload,
        status: OutboxStatus::parse(&m.status)?,
        attempts: m.attempts,
        last_error: m.last_error,
        created_at: m.created_at,
        next_attempt_at: m.next_attempt_at,
        published_at: m.published_at,
    })
}

// ── OutboxRepository impl ───────────────────────────────────────

#[async_trait]
impl OutboxRepository for SeaOrmOutboxRepository {
    async fn find_due(&self, now: DateTime<Utc>, limit: u64) -> DomainResult<Vec<OutboxMessage>> {
        let models = outbox_message::Entity::find()
            .filter(outbox_message::Column::Status.eq(OutboxStatus::Pending.as_str()))
            .filter(outbox_message::Column::NextAttemptAt.lte(now))
            .order_by_asc(outbox_message::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        models.into_iter().map(model_to_domain).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<OutboxMessage>> {
        let model = outbox_message::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        let result: UpdateResult = outbox_message::Entity::update_many()
            .col_expr(
                outbox_message::Column::Status,
                Expr::value(OutboxStatus::Published.as_str()),
            )
            .col_expr(outbox_message::Column::PublishedAt, Expr::value(at))
            .filter(outbox_message::Column::Id.eq(id.to_string()))
            .filter(outbox_message::Column::Status.eq(OutboxStatus::Pending.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            debug!("Outbox message {} was not pending, left unchanged", id);
        }
        Ok(())
    }

    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
        give_up: bool,
    ) -> DomainResult<()> {
        let status = if give_up {
            OutboxStatus::Failed
        } else {
            OutboxStatus::Pending
        };

        outbox_message::Entity::update_many()
            .col_expr(
                outbox_message::Column::Attempts,
                Expr::col(outbox_message::Column::Attempts).add(1),
            )
            .col_expr(outbox_message::Column::LastError, Expr::value(error))
            .col_expr(outbox_message::Column::NextAttemptAt, Expr::value(next_attempt_at))
            .col_expr(outbox_message::Column::Status, Expr::value(status.as_str()))
            .filter(outbox_message::Column::Id.eq(id.to_string()))
            .filter(outbox_message::Column::Status.eq(OutboxStatus::Pending.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn stats(&self) -> DomainResult<OutboxStats> {
        Ok(OutboxStats {
            pending: self.count_with_status(OutboxStatus::Pending).await?,
            published: self.count_with_status(OutboxStatus::Published).await?,
            failed: self.count_with_status(OutboxStatus::Failed).await?,
        })
    }
}
