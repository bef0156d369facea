//! Shared test utilities for `ShowtimeBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        catalog,
        session::{self, CreateSessionArgs},
        slot::{self, CreateSlotArgs},
        voucher::CreateVoucherArgs,
    },
    entities::{self, VoucherType},
    errors::Result,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

pub use crate::core::clock::FixedClock;

/// Routes `tracing` output through the test harness; honours `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A UTC instant, e.g. `at(2025, 7, 5, 9, 0)`.
#[allow(clippy::unwrap_used)]
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
}

/// A calendar day.
#[allow(clippy::unwrap_used)]
pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A wall-clock time of day.
#[allow(clippy::unwrap_used)]
pub fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// The instant every test treats as "now": 2025-07-01 08:00 UTC.
pub fn test_now() -> DateTime<Utc> {
    at(2025, 7, 1, 8, 0)
}

/// A clock frozen at [`test_now`].
pub fn test_clock() -> FixedClock {
    FixedClock(test_now())
}

/// Creates a test movie.
pub async fn create_test_movie(
    db: &DatabaseConnection,
    title: &str,
    duration: i32,
) -> Result<entities::movie::Model> {
    catalog::create_movie(db, &test_clock(), title, duration).await
}

/// Creates a test room.
pub async fn create_test_room(
    db: &DatabaseConnection,
    name: &str,
    capacity: i32,
) -> Result<entities::room::Model> {
    catalog::create_room(db, &test_clock(), name, capacity).await
}

/// Creates an active session running 08:00-23:00 on `date`.
pub async fn create_test_session(
    db: &DatabaseConnection,
    name: &str,
    date: NaiveDate,
) -> Result<entities::showtime_session::Model> {
    session::create_session(
        db,
        &test_clock(),
        CreateSessionArgs {
            name: name.to_string(),
            date,
            start_time: hm(8, 0),
            end_time: hm(23, 0),
            description: None,
            is_active: None,
        },
    )
    .await
}

/// Slot arguments with no price, notes or activity override.
pub fn slot_args(
    session_id: i64,
    movie_id: i64,
    room_id: i64,
    start_time: DateTime<Utc>,
) -> CreateSlotArgs {
    CreateSlotArgs {
        session_id,
        movie_id,
        room_id,
        start_time,
        base_price: None,
        notes: None,
        is_active: None,
    }
}

/// Creates a slot starting at `start_time`.
pub async fn create_test_slot(
    db: &DatabaseConnection,
    session_id: i64,
    movie_id: i64,
    room_id: i64,
    start_time: DateTime<Utc>,
) -> Result<entities::showtime_slot::Model> {
    slot::create_slot(
        db,
        &test_clock(),
        slot_args(session_id, movie_id, room_id, start_time),
    )
    .await
}

/// Voucher arguments valid from 2025-06-01 through 2025-12-31, all movies, no limits.
pub fn voucher_args(code: &str, voucher_type: VoucherType) -> CreateVoucherArgs {
    CreateVoucherArgs::new(
        code,
        format!("{code} promotion"),
        voucher_type,
        at(2025, 6, 1, 0, 0),
        at(2025, 12, 31, 23, 59),
    )
}

/// A database holding one movie, room and session, ready for slots.
pub struct TestFixture {
    pub db: DatabaseConnection,
    /// "Morning Session" on 2025-07-05
    pub session: entities::showtime_session::Model,
    /// 110 minutes, so a slot spans two hours with the buffer
    pub movie: entities::movie::Model,
    /// 100 seats
    pub room: entities::room::Model,
}

/// A [`TestFixture`] plus one slot starting 2025-07-05 09:00.
pub struct SlotFixture {
    pub db: DatabaseConnection,
    pub session: entities::showtime_session::Model,
    pub movie: entities::movie::Model,
    pub room: entities::room::Model,
    pub slot: entities::showtime_slot::Model,
}

/// Sets up a database with a movie, a room and a session.
pub async fn setup_test_fixture() -> Result<TestFixture> {
    let db = setup_test_db().await?;
    let movie = create_test_movie(&db, "Test Movie", 110).await?;
    let room = create_test_room(&db, "Hall A", 100).await?;
    let session = create_test_session(&db, "Morning Session", day(2025, 7, 5)).await?;
    Ok(TestFixture {
        db,
        session,
        movie,
        room,
    })
}

/// Sets up a complete test environment with one scheduled slot.
pub async fn setup_with_slot() -> Result<SlotFixture> {
    let TestFixture {
        db,
        session,
        movie,
        room,
    } = setup_test_fixture().await?;
    let slot = create_test_slot(&db, session.id, movie.id, room.id, at(2025, 7, 5, 9, 0)).await?;
    Ok(SlotFixture {
        db,
        session,
        movie,
        room,
        slot,
    })
}
