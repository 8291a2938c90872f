//! Reservation lifecycle transition table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Reservation, ReservationStatus};
use crate::domain::DomainResult;
use crate::shared::errors::DomainError;

/// Operator actions that move a reservation between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Confirm,
    Cancel,
    Complete,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 3] = [Self::Confirm, Self::Cancel, Self::Complete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ReservationStatus {
    /// Target status of `action`, or `None` when the transition is illegal.
    ///
    /// | from \ action | confirm   | cancel    | complete  |
    /// |---------------|-----------|-----------|-----------|
    /// | Pending       | Confirmed | Cancelled | -         |
    /// | Confirmed     | -         | Cancelled | Completed |
    /// | Cancelled     | -         | -         | -         |
    /// | Completed     | -         | -         | -         |
    pub fn apply(self, action: LifecycleAction) -> Option<ReservationStatus> {
        use LifecycleAction::*;
        use ReservationStatus::*;

        match (self, action) {
            (Pending, Confirm) => Some(Confirmed),
            (Pending, Cancel) | (Confirmed, Cancel) => Some(Cancelled),
            (Confirmed, Complete) => Some(Completed),
            _ => None,
        }
    }
}

impl Reservation {
    /// Move to the status `action` leads to, touching `updated_at`.
    /// The version bump happens in the store.
    pub fn transition(&mut self, action: LifecycleAction, now: DateTime<Utc>) -> DomainResult<()> {
        let next = self
            .status
            .apply(action)
            .ok_or(DomainError::IllegalTransition {
                id: self.id,
                from: self.status,
                action,
            })?;
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
