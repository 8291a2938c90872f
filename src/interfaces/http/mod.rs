//! HTTP REST API
//!
//! - `common`: response envelope, error mapping, validated JSON
//! - `modules`: handlers and DTOs per resource
//! - `router`: routes, middleware and Swagger documentation

pub mod common;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiContext};
