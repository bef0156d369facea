//! Database configuration module for `ShowtimeBuddy`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! then the composite unique indexes the entities cannot express are added on top.

use crate::entities::{
    Movie, Room, ShowtimeSession, ShowtimeSlot, Voucher, showtime_session, showtime_slot,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/showtime_buddy.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Besides the per-entity tables this adds:
/// - a unique `(name, date)` index on sessions
/// - a unique `(session_id, room_id, start_time)` index on slots
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    for mut table in [
        schema.create_table_from_entity(Movie),
        schema.create_table_from_entity(Room),
        schema.create_table_from_entity(ShowtimeSession),
        schema.create_table_from_entity(ShowtimeSlot),
        schema.create_table_from_entity(Voucher),
    ] {
        table.if_not_exists();
        db.execute(builder.build(&table)).await?;
    }

    let session_name_date = Index::create()
        .name("idx_showtime_sessions_name_date")
        .table(ShowtimeSession)
        .col(showtime_session::Column::Name)
        .col(showtime_session::Column::Date)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&session_name_date)).await?;

    let slot_room_start = Index::create()
        .name("idx_showtime_slots_session_room_start")
        .table(ShowtimeSlot)
        .col(showtime_slot::Column::SessionId)
        .col(showtime_slot::Column::RoomId)
        .col(showtime_slot::Column::StartTime)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&slot_room_start)).await?;

    info!("Database tables and indexes are in place");
    Ok(())
}
