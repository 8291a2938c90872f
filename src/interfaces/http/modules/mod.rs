pub mod health;
pub mod metrics;
pub mod outbox;
pub mod request_id;
pub mod reservations;
