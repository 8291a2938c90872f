use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::reservation::{LifecycleAction, ReservationStatus};

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// `field` uses the wire (camelCase) name so callers can point at the input.
    #[error("Validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(
        "Room {room_id} is already booked for [{check_in}, {check_out}) \
         (conflicting reservations: {conflicting_ids:?})"
    )]
    Conflict {
        room_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
        conflicting_ids: Vec<i64>,
    },

    #[error("Reservation {id} was modified concurrently (expected version {expected_version})")]
    StaleWrite { id: i64, expected_version: i64 },

    #[error("Cannot {action} reservation {id} while it is {from}")]
    IllegalTransition {
        id: i64,
        from: ReservationStatus,
        action: LifecycleAction,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn reservation_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Reservation",
            field: "id",
            value: id.to_string(),
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage(_))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
