//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::interval::StayInterval;
use super::model::{HotelWindow, Reservation, ReservationDraft, ReservationFilter};
use crate::domain::outbox::OutboxMessage;
use crate::domain::DomainResult;
use crate::shared::types::{PaginatedResult, PaginationParams};

/// Reservation store.
///
/// Implementations enforce room exclusivity themselves: an insert or
/// update that would overlap another active Pending/Confirmed row on the
/// same room fails with `DomainError::Conflict`, whatever the caller
/// checked beforehand. Soft-deleted rows are invisible to every read.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert a `Pending` reservation and its booked-event outbox row
    /// atomically. Returns the committed row with its assigned id and the
    /// outbox message. `dispatch_after` is the `next_attempt_at` of the
    /// outbox row.
    async fn insert_booked(
        &self,
        draft: ReservationDraft,
        now: DateTime<Utc>,
        dispatch_after: DateTime<Utc>,
    ) -> DomainResult<(Reservation, OutboxMessage)>;

    /// Find an active reservation by ID
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Reservation>>;

    /// Active Pending/Confirmed reservations on `room_id` overlapping
    /// `interval`, ordered by check-in
    async fn find_overlapping(
        &self,
        room_id: i64,
        interval: StayInterval,
        exclude_id: Option<i64>,
    ) -> DomainResult<Vec<Reservation>>;

    /// Write all mutable fields of `reservation` if the stored version is
    /// still `expected_version`, bumping it by one. Fails with `StaleWrite`
    /// on mismatch and `NotFound` when the row is gone.
    async fn update_versioned(
        &self,
        reservation: Reservation,
        expected_version: i64,
    ) -> DomainResult<Reservation>;

    /// Soft delete. Returns `false` when no active row had this ID.
    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> DomainResult<bool>;

    /// Active reservations matching `filter`, newest first
    async fn find_page(
        &self,
        filter: ReservationFilter,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Reservation>>;

    /// Active reservations of a hotel, optionally narrowed to a window,
    /// ordered by check-in
    async fn find_by_hotel(
        &self,
        hotel_id: i64,
        window: Option<HotelWindow>,
    ) -> DomainResult<Vec<Reservation>>;
}
