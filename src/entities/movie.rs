//! Movie entity - the part of the film catalog the scheduler depends on.
//!
//! Only the runtime matters here: a slot's end time is derived from `duration`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Movie database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    /// Unique identifier for the movie
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display title
    pub title: String,
    /// Runtime in minutes
    pub duration: i32,
    /// When the movie was added to the catalog
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One movie is screened in many slots
    #[sea_orm(has_many = "super::showtime_slot::Entity")]
    Slots,
}

impl Related<super::showtime_slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
