//! Reservation status transitions

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::{
    DomainError, DomainResult, LifecycleAction, RepositoryProvider, Reservation,
};

/// Applies confirm/cancel/complete as single version-guarded writes
#[derive(Clone)]
pub struct LifecycleService {
    repos: Arc<dyn RepositoryProvider>,
}

impl LifecycleService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn confirm(&self, id: i64) -> DomainResult<Reservation> {
        self.apply(id, LifecycleAction::Confirm).await
    }

    /// Cancelling frees the room as soon as the write commits.
    pub async fn cancel(&self, id: i64) -> DomainResult<Reservation> {
        self.apply(id, LifecycleAction::Cancel).await
    }

    pub async fn complete(&self, id: i64) -> DomainResult<Reservation> {
        self.apply(id, LifecycleAction::Complete).await
    }

    pub async fn apply(&self, id: i64, action: LifecycleAction) -> DomainResult<Reservation> {
        let mut reservation = self
            .repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::reservation_not_found(id))?;

        let from = reservation.status;
        let loaded_version = reservation.version;
        reservation.transition(action, Utc::now())?;

        let updated = self
            .repos
            .reservations()
            .update_versioned(reservation, loaded_version)
            .await?;

        metrics::counter!(
            "reservation_transitions_total",
            "action" => action.as_str()
        )
        .increment(1);
        info!(
            reservation_id = id,
            from = %from,
            to = %updated.status,
            version = updated.version,
            "Reservation status changed"
        );
        Ok(updated)
    }
}
