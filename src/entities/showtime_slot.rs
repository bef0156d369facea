//! Showtime slot entity - one concrete screening of a movie in a room.
//!
//! `end_time` is derived at creation (`start_time + duration + buffer`) and
//! `total_seats` is a snapshot of the room capacity at that moment, not a live
//! reference. `booked_seats` is the occupancy counter; `0 <= booked_seats <= total_seats`
//! is maintained by `core::slot::update_booked_seats`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Showtime slot database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "showtime_slots")]
pub struct Model {
    /// Unique identifier for the slot
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Session this slot belongs to
    pub session_id: i64,
    /// Movie being screened
    pub movie_id: i64,
    /// Room the screening takes place in
    pub room_id: i64,
    /// Absolute start of the screening
    pub start_time: DateTimeUtc,
    /// Absolute end of the screening, buffer included (exclusive)
    pub end_time: DateTimeUtc,
    /// Base ticket price for this slot
    pub base_price: f64,
    /// Seats already booked
    pub booked_seats: i32,
    /// Seat capacity captured from the room at creation time
    pub total_seats: i32,
    /// Inactive slots are ignored by conflict checks and availability queries
    pub is_active: bool,
    /// Optional notes (e.g. "Special morning rate")
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Seats still open for booking.
    #[must_use]
    pub const fn available_seats(&self) -> i32 {
        self.total_seats - self.booked_seats
    }

    /// Whether every seat has been booked.
    #[must_use]
    pub const fn is_fully_booked(&self) -> bool {
        self.booked_seats >= self.total_seats
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::showtime_session::Entity",
        from = "Column::SessionId",
        to = "super::showtime_session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::movie::Entity",
        from = "Column::MovieId",
        to = "super::movie::Column::Id"
    )]
    Movie,
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
}

impl Related<super::showtime_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::movie::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movie.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
