//! Booking use cases: conflict detection, creation and updates,
//! status transitions and read-side queries.

pub mod conflict;
pub mod coordinator;
pub mod lifecycle;
pub mod queries;

pub use conflict::ConflictDetector;
pub use coordinator::BookingCoordinator;
pub use lifecycle::LifecycleService;
pub use queries::{HotelStatistics, ReservationQueries};
