//! # Hotel Reservation Service
//!
//! Room reservations for hotels, where no two active bookings of one room
//! may share a night. Exclusivity is enforced by the store itself, and each
//! new booking emits a `RESERVATION_CREATED` event through a transactional
//! outbox.
//!
//! ## Architecture
//!
//! - **domain**: reservations, stay intervals, lifecycle, outbox messages and
//!   repository traits
//! - **application**: booking coordinator, conflict detection, lifecycle
//!   transitions, read views and event delivery
//! - **infrastructure**: SeaORM repositories, migrations and the in-memory store
//! - **interfaces**: REST API with Swagger documentation and the WebSocket
//!   event stream
//! - **server**: process runtime and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export store types for easy access
pub use infrastructure::{
    init_database, DatabaseConfig, InMemoryRepositoryProvider, SeaOrmRepositoryProvider,
};

pub use interfaces::http::create_api_router;

pub use application::{create_event_bus, EventBus, SharedEventBus};
