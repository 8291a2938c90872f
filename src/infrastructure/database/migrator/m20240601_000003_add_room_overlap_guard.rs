//! Enforce room exclusivity in the database
//!
//! No two active Pending/Confirmed reservations on one room may overlap
//! on `[check_in, check_out)`. SQLite gets BEFORE INSERT/UPDATE triggers
//! raising `reservation_overlap`; PostgreSQL gets a GiST exclusion
//! constraint over the date range.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend};

/// Message raised by the SQLite triggers
pub const SQLITE_OVERLAP_MARKER: &str = "reservation_overlap";

/// Name of the PostgreSQL exclusion constraint
pub const POSTGRES_OVERLAP_CONSTRAINT: &str = "excl_reservations_room_overlap";

const SQLITE_UP: &str = r#"
CREATE TRIGGER IF NOT EXISTS trg_reservations_overlap_insert
BEFORE INSERT ON reservations
WHEN NEW.active = 1 AND NEW.status IN ('Pending', 'Confirmed')
BEGIN
    SELECT RAISE(ABORT, 'reservation_overlap')
    WHERE EXISTS (
        SELECT 1 FROM reservations r
        WHERE r.room_id = NEW.room_id
          AND r.active = 1
          AND r.status IN ('Pending', 'Confirmed')
          AND r.check_in < NEW.check_out
          AND NEW.check_in < r.check_out
    );
END;

CREATE TRIGGER IF NOT EXISTS trg_reservations_overlap_update
BEFORE UPDATE ON reservations
WHEN NEW.active = 1 AND NEW.status IN ('Pending', 'Confirmed')
BEGIN
    SELECT RAISE(ABORT, 'reservation_overlap')
    WHERE EXISTS (
        SELECT 1 FROM reservations r
        WHERE r.room_id = NEW.room_id
          AND r.id <> NEW.id
          AND r.active = 1
          AND r.status IN ('Pending', 'Confirmed')
          AND r.check_in < NEW.check_out
          AND NEW.check_in < r.check_out
    );
END;
"#;

const SQLITE_DOWN: &str = r#"
DROP TRIGGER IF EXISTS trg_reservations_overlap_insert;
DROP TRIGGER IF EXISTS trg_reservations_overlap_update;
"#;

const POSTGRES_UP: &str = r#"
CREATE EXTENSION IF NOT EXISTS btree_gist;

ALTER TABLE reservations
    ADD CONSTRAINT excl_reservations_room_overlap
    EXCLUDE USING gist (
        room_id WITH =,
        daterange(check_in, check_out, '[)') WITH &&
    )
    WHERE (active AND status IN ('Pending', 'Confirmed'));
"#;

const POSTGRES_DOWN: &str = r#"
ALTER TABLE reservations DROP CONSTRAINT IF EXISTS excl_reservations_room_overlap;
"#;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = match manager.get_database_backend() {
            DatabaseBackend::Sqlite => SQLITE_UP,
            DatabaseBackend::Postgres => POSTGRES_UP,
            other => {
                return Err(DbErr::Migration(format!(
                    "room overlap guard is not available for {:?}",
                    other
                )))
            }
        };
        manager.get_connection().execute_unprepared(sql).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = match manager.get_database_backend() {
            DatabaseBackend::Sqlite => SQLITE_DOWN,
            DatabaseBackend::Postgres => POSTGRES_DOWN,
            _ => return Ok(()),
        };
        manager.get_connection().execute_unprepared(sql).await?;
        Ok(())
    }
}
