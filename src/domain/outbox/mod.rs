//! Transactional outbox
//!
//! Events written next to the state change they describe, delivered
//! at-least-once by the event emitter.

pub mod model;
pub mod repository;

pub use model::{
    OutboxMessage, OutboxStats, OutboxStatus, ReservationBookedEvent, RESERVATION_CREATED,
};
pub use repository::OutboxRepository;
