//! Showtime session entity - a named time window on one calendar day.
//!
//! A session (e.g. "Morning Session" on 2025-07-05, 09:00-12:00) groups the slots
//! that are screened during it and is the boundary for slot overlap checks.
//! The pair (`name`, `date`) is unique; see `config::database::create_tables`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Showtime session database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "showtime_sessions")]
pub struct Model {
    /// Unique identifier for the session
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Session name, e.g. "Morning Session"
    pub name: String,
    /// Calendar day of the session
    pub date: Date,
    /// Start of the session window
    pub start_time: Time,
    /// End of the session window
    pub end_time: Time,
    /// Optional free-form description
    pub description: Option<String>,
    /// Inactive sessions are hidden from listings
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One session owns many slots
    #[sea_orm(has_many = "super::showtime_slot::Entity")]
    Slots,
}

impl Related<super::showtime_slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
