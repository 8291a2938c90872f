//! Outbox message entity and the reservation-booked payload

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::reservation::Reservation;
use crate::domain::DomainResult;
use crate::shared::errors::DomainError;
use crate::shared::time;

/// Event type of the booking fact
pub const RESERVATION_CREATED: &str = "RESERVATION_CREATED";

/// Delivery state of an outbox row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutboxStatus {
    /// Waiting for (re)delivery
    Pending,
    /// Handed to the publisher
    Published,
    /// Gave up after the maximum number of attempts
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Published => "Published",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Published" => Ok(Self::Published),
            "Failed" => Ok(Self::Failed),
            other => Err(DomainError::Storage(format!(
                "unknown outbox status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a freshly committed reservation, as consumed downstream.
///
/// Field names are snake_case on the wire; consumers dedupe by
/// `reservation_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationBookedEvent {
    pub reservation_id: i64,
    pub hotel_id: i64,
    pub room_id: i64,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_guests: i32,
    pub total_price: Decimal,
    pub status: String,
    pub special_requests: Option<String>,
    #[serde(with = "time::timestamp")]
    pub created_at: DateTime<Utc>,
    pub event_type: String,
    #[serde(with = "time::timestamp")]
    pub event_timestamp: DateTime<Utc>,
}

impl ReservationBookedEvent {
    pub fn from_reservation(r: &Reservation, event_timestamp: DateTime<Utc>) -> Self {
        Self {
            reservation_id: r.id,
            hotel_id: r.hotel_id,
            room_id: r.room_id,
            guest_name: r.guest_name.clone(),
            guest_email: r.guest_email.clone(),
            guest_phone: r.guest_phone.clone(),
            check_in_date: r.check_in,
            check_out_date: r.check_out,
            number_of_guests: r.number_of_guests,
            total_price: r.total_price,
            status: r.status.as_str().to_uppercase(),
            special_requests: r.special_requests.clone(),
            created_at: r.created_at,
            event_type: RESERVATION_CREATED.to_string(),
            event_timestamp,
        }
    }
}

/// A pending or delivered event, written in the same transaction as the
/// state change it describes. The payload is never rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub event_type: String,
    /// Reservation the event is about
    pub aggregate_id: i64,
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Earliest time the dispatcher may pick this row up
    pub next_attempt_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    /// Build the booked-event row for a reservation that has its final id.
    ///
    /// `next_attempt_at` is pushed past `now` so the dispatcher leaves the
    /// row to the fast path for a grace period.
    pub fn reservation_booked(
        reservation: &Reservation,
        now: DateTime<Utc>,
        next_attempt_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let event = ReservationBookedEvent::from_reservation(reservation, now);
        let payload = serde_json::to_value(&event)
            .map_err(|e| DomainError::Storage(format!("failed to encode event payload: {}", e)))?;

        Ok(Self {
            id: Uuid::new_v4(),
            event_type: RESERVATION_CREATED.to_string(),
            aggregate_id: reservation.id,
            payload,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            next_attempt_at,
            published_at: None,
        })
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == OutboxStatus::Pending && self.next_attempt_at <= now
    }
}

/// Row counts per delivery state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutboxStats {
    pub pending: u64,
    pub published: u64,
    pub failed: u64,
}
