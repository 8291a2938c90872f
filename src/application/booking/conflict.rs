//! Room conflict detection

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{DomainResult, RepositoryProvider, Reservation, StayInterval};

/// Read-only overlap queries against the reservation store.
///
/// Only active Pending/Confirmed reservations count; Cancelled and
/// Completed stays and soft-deleted rows never block a room.
#[derive(Clone)]
pub struct ConflictDetector {
    repos: Arc<dyn RepositoryProvider>,
}

impl ConflictDetector {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn has_conflict(
        &self,
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude_reservation_id: Option<i64>,
    ) -> DomainResult<bool> {
        let conflicts = self
            .list_conflicts(room_id, check_in, check_out, exclude_reservation_id)
            .await?;
        Ok(!conflicts.is_empty())
    }

    /// Reservations colliding with `[check_in, check_out)` on `room_id`,
    /// ordered by check-in.
    pub async fn list_conflicts(
        &self,
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude_reservation_id: Option<i64>,
    ) -> DomainResult<Vec<Reservation>> {
        let interval = StayInterval::new(check_in, check_out)?;
        self.conflicts_for(room_id, interval, exclude_reservation_id)
            .await
    }

    pub(crate) async fn conflicts_for(
        &self,
        room_id: i64,
        interval: StayInterval,
        exclude_reservation_id: Option<i64>,
    ) -> DomainResult<Vec<Reservation>> {
        let candidates = self
            .repos
            .reservations()
            .find_overlapping(room_id, interval, exclude_reservation_id)
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|r| Some(r.id) != exclude_reservation_id && r.occupies(room_id, &interval))
            .collect())
    }
}
