//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_reservations;
mod m20240601_000002_create_outbox_messages;
mod m20240601_000003_add_room_overlap_guard;

pub use m20240601_000003_add_room_overlap_guard::{
    POSTGRES_OVERLAP_CONSTRAINT, SQLITE_OVERLAP_MARKER,
};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_reservations::Migration),
            Box::new(m20240601_000002_create_outbox_messages::Migration),
            Box::new(m20240601_000003_add_room_overlap_guard::Migration),
        ]
    }
}
