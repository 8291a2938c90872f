//! Reservation aggregate
//!
//! Contains the Reservation entity, the stay interval, the lifecycle
//! transition table and the repository interface.

pub mod interval;
pub mod lifecycle;
pub mod model;
pub mod repository;

pub use interval::StayInterval;
pub use lifecycle::LifecycleAction;
pub use model::{
    HotelWindow, Reservation, ReservationDraft, ReservationFilter, ReservationStatus,
};
pub use repository::ReservationRepository;
