//! Half-open stay interval `[check_in, check_out)`.

use chrono::NaiveDate;

use crate::domain::DomainResult;
use crate::shared::errors::DomainError;

/// A stay on a room: the guest occupies the nights from `check_in` up to,
/// but not including, `check_out`.
///
/// Construction enforces `check_in < check_out`, so every value is a
/// non-empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StayInterval {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayInterval {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> DomainResult<Self> {
        if check_in >= check_out {
            return Err(DomainError::validation(
                "checkOut",
                format!(
                    "check-out date {} must be after check-in date {}",
                    check_out, check_in
                ),
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Strict half-open overlap. A check-out on the same day as another
    /// stay's check-in is not an overlap.
    pub fn overlaps(&self, other: &StayInterval) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

impl std::fmt::Display for StayInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}
