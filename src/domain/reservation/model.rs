//! Reservation domain entity

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::interval::StayInterval;
use crate::domain::DomainResult;
use crate::shared::errors::DomainError;

pub const MIN_GUESTS: i32 = 1;
pub const MAX_GUESTS: i32 = 10;
pub const MAX_SPECIAL_REQUESTS_LEN: usize = 500;
/// Money columns are `DECIMAL(10, 2)`
pub const PRICE_SCALE: u32 = 2;
/// 99999999.99
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Booked, awaiting confirmation
    Pending,
    /// Confirmed by the hotel
    Confirmed,
    /// Cancelled by the guest or the hotel
    Cancelled,
    /// Stay finished
    Completed,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Cancelled,
        Self::Completed,
    ];

    /// Statuses that hold a room for their interval.
    pub const BLOCKING: [ReservationStatus; 2] = [Self::Pending, Self::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::validation(
                "status",
                format!("unknown reservation status '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A room booking for a half-open date interval
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    /// Store-assigned ID
    pub id: i64,
    /// Hotel in the external catalog
    pub hotel_id: i64,
    /// Room in the external catalog
    pub room_id: i64,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    /// First night of the stay
    pub check_in: NaiveDate,
    /// Departure day, not occupied
    pub check_out: NaiveDate,
    pub number_of_guests: i32,
    pub total_price: Decimal,
    pub special_requests: Option<String>,
    pub status: ReservationStatus,
    /// False once soft-deleted
    pub active: bool,
    /// Bumped on every write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Materialize a validated draft as a new `Pending` reservation.
    /// The store replaces `id` when the row is inserted.
    pub fn from_draft(id: i64, draft: ReservationDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            hotel_id: draft.hotel_id,
            room_id: draft.room_id,
            guest_name: draft.guest_name,
            guest_email: draft.guest_email,
            guest_phone: draft.guest_phone,
            check_in: draft.check_in,
            check_out: draft.check_out,
            number_of_guests: draft.number_of_guests,
            total_price: draft.total_price,
            special_requests: draft.special_requests,
            status: ReservationStatus::Pending,
            active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn interval(&self) -> DomainResult<StayInterval> {
        StayInterval::new(self.check_in, self.check_out)
    }

    /// Whether this row participates in the room exclusivity set.
    pub fn holds_room(&self) -> bool {
        self.active && self.status.is_blocking()
    }

    /// Whether this row holds `room_id` for any night of `interval`.
    pub fn occupies(&self, room_id: i64, interval: &StayInterval) -> bool {
        self.room_id == room_id
            && self.holds_room()
            && self.check_in < interval.check_out()
            && interval.check_in() < self.check_out
    }

    /// Overwrite the mutable booking fields with a validated draft.
    pub fn apply_draft(&mut self, draft: ReservationDraft) {
        self.hotel_id = draft.hotel_id;
        self.room_id = draft.room_id;
        self.guest_name = draft.guest_name;
        self.guest_email = draft.guest_email;
        self.guest_phone = draft.guest_phone;
        self.check_in = draft.check_in;
        self.check_out = draft.check_out;
        self.number_of_guests = draft.number_of_guests;
        self.total_price = draft.total_price;
        self.special_requests = draft.special_requests;
    }
}

/// Caller-supplied booking fields for create and update
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationDraft {
    pub hotel_id: i64,
    pub room_id: i64,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub number_of_guests: i32,
    pub total_price: Decimal,
    pub special_requests: Option<String>,
}

impl ReservationDraft {
    /// Check the booking invariants, failing on the first violated field.
    pub fn validate(&self) -> DomainResult<StayInterval> {
        let interval = StayInterval::new(self.check_in, self.check_out)?;

        if self.guest_name.trim().is_empty() {
            return Err(DomainError::validation("guestName", "guest name must not be blank"));
        }

        if !(MIN_GUESTS..=MAX_GUESTS).contains(&self.number_of_guests) {
            return Err(DomainError::validation(
                "numberOfGuests",
                format!(
                    "number of guests must be between {} and {}, got {}",
                    MIN_GUESTS, MAX_GUESTS, self.number_of_guests
                ),
            ));
        }

        if self.total_price <= Decimal::ZERO {
            return Err(DomainError::validation(
                "totalPrice",
                format!("total price must be greater than 0, got {}", self.total_price),
            ));
        }
        if self.total_price.normalize().scale() > PRICE_SCALE || self.total_price > MAX_PRICE {
            return Err(DomainError::validation(
                "totalPrice",
                format!(
                    "total price must have at most {} decimal places and not exceed {}, got {}",
                    PRICE_SCALE, MAX_PRICE, self.total_price
                ),
            ));
        }

        if let Some(requests) = &self.special_requests {
            if requests.chars().count() > MAX_SPECIAL_REQUESTS_LEN {
                return Err(DomainError::validation(
                    "specialRequests",
                    format!(
                        "special requests must be at most {} characters",
                        MAX_SPECIAL_REQUESTS_LEN
                    ),
                ));
            }
        }

        Ok(interval)
    }
}

/// Listing filter; `None` fields match everything. Ranges are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationFilter {
    pub hotel_id: Option<i64>,
    pub room_id: Option<i64>,
    pub guest_email: Option<String>,
    /// Case-insensitive substring of the guest name
    pub guest_name: Option<String>,
    pub status: Option<ReservationStatus>,
    pub check_in_from: Option<NaiveDate>,
    pub check_in_to: Option<NaiveDate>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ReservationFilter {
    /// Reject inverted ranges.
    pub fn validate(&self) -> DomainResult<()> {
        if let (Some(from), Some(to)) = (self.check_in_from, self.check_in_to) {
            if from > to {
                return Err(DomainError::validation(
                    "checkInTo",
                    format!("checkInTo ({}) is before checkInFrom ({})", to, from),
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(DomainError::validation(
                    "maxPrice",
                    format!("maxPrice ({}) is below minPrice ({})", max, min),
                ));
            }
        }
        Ok(())
    }

    /// Lowercased name fragment, `None` when absent or blank
    pub fn guest_name_fragment(&self) -> Option<String> {
        self.guest_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, r: &Reservation) -> bool {
        r.active
            && self.hotel_id.map_or(true, |h| r.hotel_id == h)
            && self.room_id.map_or(true, |room| r.room_id == room)
            && self
                .guest_email
                .as_deref()
                .map_or(true, |e| r.guest_email == e)
            && self
                .guest_name_fragment()
                .map_or(true, |n| r.guest_name.to_lowercase().contains(&n))
            && self.status.map_or(true, |s| r.status == s)
            && self.check_in_from.map_or(true, |d| r.check_in >= d)
            && self.check_in_to.map_or(true, |d| r.check_in <= d)
            && self.min_price.map_or(true, |p| r.total_price >= p)
            && self.max_price.map_or(true, |p| r.total_price <= p)
    }
}

/// Date windows for per-hotel front-desk views.
///
/// Every window only returns active Pending/Confirmed reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotelWindow {
    /// Check-in on or after the date, ordered by check-in
    Upcoming(NaiveDate),
    /// Check-in on the date
    CheckInsOn(NaiveDate),
    /// Check-out on the date
    CheckOutsOn(NaiveDate),
    /// Check-out strictly before the date without being completed
    Overdue(NaiveDate),
}

impl HotelWindow {
    pub fn matches(&self, r: &Reservation) -> bool {
        if !r.holds_room() {
            return false;
        }
        match *self {
            Self::Upcoming(today) => r.check_in >= today,
            Self::CheckInsOn(day) => r.check_in == day,
            Self::CheckOutsOn(day) => r.check_out == day,
            Self::Overdue(today) => r.check_out < today,
        }
    }
}
