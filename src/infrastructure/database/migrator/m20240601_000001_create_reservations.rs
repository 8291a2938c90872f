//! Create reservations table
//!
//! Room bookings for half-open date intervals, soft-deleted through
//! `active` and guarded by `version`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reservations::HotelId).big_integer().not_null())
                    .col(ColumnDef::new(Reservations::RoomId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Reservations::GuestName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::GuestEmail)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::GuestPhone)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reservations::CheckIn).date().not_null())
                    .col(ColumnDef::new(Reservations::CheckOut).date().not_null())
                    .col(
                        ColumnDef::new(Reservations::NumberOfGuests)
                            .integer()
                            .not_null()
                            .check(Expr::col(Reservations::NumberOfGuests).between(1, 10)),
                    )
                    .col(
                        ColumnDef::new(Reservations::TotalPrice)
                            .decimal_len(10, 2)
                            .not_null()
                            .check(Expr::col(Reservations::TotalPrice).gt(0)),
                    )
                    .col(ColumnDef::new(Reservations::SpecialRequests).string_len(500))
                    .col(
                        ColumnDef::new(Reservations::Status)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(
                        ColumnDef::new(Reservations::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Reservations::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(Reservations::CheckIn).lt(Expr::col(Reservations::CheckOut)))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_room_dates")
                    .table(Reservations::Table)
                    .col(Reservations::RoomId)
                    .col(Reservations::CheckIn)
                    .col(Reservations::CheckOut)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_hotel")
                    .table(Reservations::Table)
                    .col(Reservations::HotelId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_guest_email")
                    .table(Reservations::Table)
                    .col(Reservations::GuestEmail)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_status")
                    .table(Reservations::Table)
                    .col(Reservations::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Reservations {
    Table,
    Id,
    HotelId,
    RoomId,
    GuestName,
    GuestEmail,
    GuestPhone,
    CheckIn,
    CheckOut,
    NumberOfGuests,
    TotalPrice,
    SpecialRequests,
    Status,
    Active,
    Version,
    CreatedAt,
    UpdatedAt,
}
