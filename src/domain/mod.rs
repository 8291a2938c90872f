pub mod outbox;
pub mod repositories;
pub mod reservation;

// Re-export commonly used types
pub use outbox::{OutboxMessage, OutboxStats, OutboxStatus, ReservationBookedEvent};
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{
    HotelWindow, LifecycleAction, Reservation, ReservationDraft, ReservationFilter,
    ReservationStatus, StayInterval,
};

pub use crate::shared::errors::DomainError;
