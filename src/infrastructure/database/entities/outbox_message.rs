//! Outbox message entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outbox_messages")]
pub struct Model {
    /// UUID string
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub event_type: String,

    /// Reservation the event is about
    pub aggregate_id: i64,

    /// JSON payload, written once
    #[sea_orm(column_type = "Text")]
    pub payload: String,

    /// Pending, Published, Failed
    pub status: String,

    pub attempts: i32,

    #[sea_orm(nullable, column_type = "Text")]
    pub last_error: Option<String>,

    pub created_at: DateTimeUtc,
    pub next_attempt_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub published_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reservation::Entity",
        from = "Column::AggregateId",
        to = "super::reservation::Column::Id"
    )]
    Reservation,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
