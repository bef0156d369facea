//! Room entity - a screening room with a fixed seat capacity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Room database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    /// Unique identifier for the room
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Room name, unique across the cinema (e.g. "Hall 1")
    #[sea_orm(unique)]
    pub name: String,
    /// Number of seats; copied into each slot when the slot is created
    pub capacity: i32,
    /// When the room was registered
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One room hosts many slots
    #[sea_orm(has_many = "super::showtime_slot::Entity")]
    Slots,
}

impl Related<super::showtime_slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
