//! Booking coordinator
//!
//! Validates requests, books rooms through the store's exclusivity guard
//! and hands committed bookings to the event emitter.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::conflict::ConflictDetector;
use crate::application::events::EventEmitter;
use crate::domain::{
    DomainError, DomainResult, RepositoryProvider, Reservation, ReservationDraft, StayInterval,
};

pub struct BookingCoordinator {
    repos: Arc<dyn RepositoryProvider>,
    detector: ConflictDetector,
    emitter: EventEmitter,
    /// How long the dispatcher leaves a fresh outbox row to the fast path
    fast_path_grace: chrono::Duration,
}

impl BookingCoordinator {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        emitter: EventEmitter,
        fast_path_grace: chrono::Duration,
    ) -> Self {
        Self {
            detector: ConflictDetector::new(repos.clone()),
            repos,
            emitter,
            fast_path_grace,
        }
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    /// Book a room. The reservation starts `Pending`; its booked event is
    /// stored with it and delivered after commit.
    pub async fn create_reservation(&self, draft: ReservationDraft) -> DomainResult<Reservation> {
        let interval = draft.validate()?;

        let conflicts = self.detector.conflicts_for(draft.room_id, interval, None).await?;
        if !conflicts.is_empty() {
            let ids = conflicts.iter().map(|r| r.id).collect();
            return Err(self.conflict(draft.room_id, interval, ids));
        }

        let now = Utc::now();
        let (reservation, message) = match self
            .repos
            .reservations()
            .insert_booked(draft, now, now + self.fast_path_grace)
            .await
        {
            Ok(booked) => booked,
            Err(DomainError::Conflict {
                room_id,
                conflicting_ids,
                ..
            }) => {
                // Lost a race after the pre-check; the store rejected the write.
                let ids = self.resolve_conflicting_ids(room_id, interval, None, conflicting_ids).await;
                return Err(self.conflict(room_id, interval, ids));
            }
            Err(e) => return Err(e),
        };

        metrics::counter!("reservations_created_total").increment(1);
        info!(
            reservation_id = reservation.id,
            hotel_id = reservation.hotel_id,
            room_id = reservation.room_id,
            check_in = %reservation.check_in,
            check_out = %reservation.check_out,
            nights = interval.nights(),
            "Reservation created"
        );

        self.emitter.emit_booked(message);
        Ok(reservation)
    }

    pub async fn get_reservation(&self, id: i64) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::reservation_not_found(id))
    }

    /// Replace the booking fields of a reservation.
    ///
    /// `expected_version` defaults to the version read here; a concurrent
    /// write in between surfaces as `StaleWrite`.
    pub async fn update_reservation(
        &self,
        id: i64,
        draft: ReservationDraft,
        expected_version: Option<i64>,
    ) -> DomainResult<Reservation> {
        let interval = draft.validate()?;
        let mut reservation = self.get_reservation(id).await?;
        let version = expected_version.unwrap_or(reservation.version);

        let conflicts = self
            .detector
            .conflicts_for(draft.room_id, interval, Some(id))
            .await?;
        if !conflicts.is_empty() {
            let ids = conflicts.iter().map(|r| r.id).collect();
            return Err(self.conflict(draft.room_id, interval, ids));
        }

        reservation.apply_draft(draft);
        reservation.updated_at = Utc::now();

        match self
            .repos
            .reservations()
            .update_versioned(reservation, version)
            .await
        {
            Ok(updated) => {
                info!(reservation_id = id, version = updated.version, "Reservation updated");
                Ok(updated)
            }
            Err(DomainError::Conflict {
                room_id,
                conflicting_ids,
                ..
            }) => {
                let ids = self
                    .resolve_conflicting_ids(room_id, interval, Some(id), conflicting_ids)
                    .await;
                Err(self.conflict(room_id, interval, ids))
            }
            Err(e) => Err(e),
        }
    }

    /// Soft delete. Deleting an already deleted reservation is `NotFound`.
    pub async fn delete_reservation(&self, id: i64) -> DomainResult<()> {
        if !self.repos.reservations().soft_delete(id, Utc::now()).await? {
            return Err(DomainError::reservation_not_found(id));
        }
        info!(reservation_id = id, "Reservation deleted");
        Ok(())
    }

    fn conflict(&self, room_id: i64, interval: StayInterval, conflicting_ids: Vec<i64>) -> DomainError {
        metrics::counter!("reservation_conflicts_total").increment(1);
        warn!(
            room_id,
            interval = %interval,
            conflicting = ?conflicting_ids,
            "Reservation conflict"
        );
        DomainError::Conflict {
            room_id,
            check_in: interval.check_in(),
            check_out: interval.check_out(),
            conflicting_ids,
        }
    }

    /// The database guard does not say which rows collided; look them up.
    async fn resolve_conflicting_ids(
        &self,
        room_id: i64,
        interval: StayInterval,
        exclude: Option<i64>,
        known: Vec<i64>,
    ) -> Vec<i64> {
        if !known.is_empty() {
            return known;
        }
        match self.detector.conflicts_for(room_id, interval, exclude).await {
            Ok(conflicts) => conflicts.iter().map(|r| r.id).collect(),
            Err(e) => {
                warn!(room_id, error = %e, "Could not look up conflicting reservations");
                Vec::new()
            }
        }
    }
}
