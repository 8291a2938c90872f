//! Database entities module

pub mod outbox_message;
pub mod reservation;

pub use outbox_message::Entity as OutboxMessage;
pub use reservation::Entity as Reservation;
