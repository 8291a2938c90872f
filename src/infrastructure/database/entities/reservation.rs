//! Reservation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub hotel_id: i64,
    pub room_id: i64,

    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: String,

    /// Stored as `YYYY-MM-DD`
    pub check_in: Date,
    pub check_out: Date,

    pub number_of_guests: i32,

    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_price: Decimal,

    #[sea_orm(nullable)]
    pub special_requests: Option<String>,

    /// Reservation status: Pending, Confirmed, Cancelled, Completed
    pub status: String,

    pub active: bool,
    pub version: i64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::outbox_message::Entity")]
    OutboxMessage,
}

impl Related<super::outbox_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OutboxMessage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
