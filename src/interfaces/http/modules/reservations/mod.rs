//! Reservation booking, lifecycle and hotel views

pub mod dto;
pub mod handlers;

pub use handlers::*;
