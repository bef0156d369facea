//! Showtime slot business logic - scheduling and seat occupancy.
//!
//! A slot's end time is `start_time + movie.duration + SLOT_BUFFER_MINUTES`, and its seat
//! capacity is copied from the room when the slot is created. Two active slots in the
//! same session and room never overlap on their half-open `[start_time, end_time)`
//! intervals; back-to-back slots are allowed.
//!
//! Slot creation is serialized per (`room_id`, `session_id`) so the conflict scan and the
//! insert cannot interleave with another creation for the same room and session. Seat
//! counts only ever change through [`update_booked_seats`], which applies the delta with
//! a single conditional update.

use crate::{
    core::{
        catalog::{require_movie, require_room},
        clock::Clock,
        counter::{BoundedCounter, Ceiling},
        session::get_session_by_id,
    },
    entities::{ShowtimeSlot, showtime_slot},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

/// Cleaning/turnover gap appended to every screening.
pub const SLOT_BUFFER_MINUTES: i64 = 10;

/// Attempts made by [`update_booked_seats`] before giving up on a contended row.
const MAX_COUNTER_ATTEMPTS: usize = 3;

const SEAT_COUNTER: BoundedCounter<showtime_slot::Column> = BoundedCounter {
    id: showtime_slot::Column::Id,
    counter: showtime_slot::Column::BookedSeats,
    ceiling: Ceiling::Column(showtime_slot::Column::TotalSeats),
    touched_at: showtime_slot::Column::UpdatedAt,
};

/// One async lock per (`room_id`, `session_id`) guarding slot creation.
static CREATION_LOCKS: LazyLock<DashMap<(i64, i64), Arc<Mutex<()>>>> = LazyLock::new(DashMap::new);

/// Exclusive right to create slots for one (`room_id`, `session_id`). Dropping it
/// releases the lock and evicts the registry entry once nobody else holds or awaits it.
struct CreationPermit {
    key: (i64, i64),
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CreationPermit {
    fn drop(&mut self) {
        self.guard.take();
        CREATION_LOCKS.remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

async fn acquire_creation_lock(room_id: i64, session_id: i64) -> CreationPermit {
    let key = (room_id, session_id);
    let lock = Arc::clone(&CREATION_LOCKS.entry(key).or_default());
    CreationPermit {
        key,
        guard: Some(lock.lock_owned().await),
    }
}

/// Arguments for [`create_slot`].
#[derive(Debug, Clone)]
pub struct CreateSlotArgs {
    pub session_id: i64,
    pub movie_id: i64,
    pub room_id: i64,
    pub start_time: DateTime<Utc>,
    /// Defaults to 0
    pub base_price: Option<f64>,
    pub notes: Option<String>,
    /// Defaults to `true`
    pub is_active: Option<bool>,
}

/// Slot creation input as received from the transport layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotRequest {
    pub session_id: i64,
    pub movie_id: i64,
    pub room_id: i64,
    /// ISO-8601 timestamp, e.g. `2025-07-05T09:30:00.000Z`
    pub start_time: String,
    pub base_price: Option<f64>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl TryFrom<CreateSlotRequest> for CreateSlotArgs {
    type Error = Error;

    fn try_from(request: CreateSlotRequest) -> Result<Self> {
        let start_time = DateTime::parse_from_rfc3339(&request.start_time)
            .map_err(|e| Error::Validation {
                message: format!("startTime '{}' is not ISO-8601: {e}", request.start_time),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            session_id: request.session_id,
            movie_id: request.movie_id,
            room_id: request.room_id,
            start_time,
            base_price: request.base_price,
            notes: request.notes,
            is_active: request.is_active,
        })
    }
}

/// Slot as exposed to callers: the stored row plus its derived seat figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    pub id: i64,
    pub session_id: i64,
    pub movie_id: i64,
    pub room_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub base_price: f64,
    pub booked_seats: i32,
    pub total_seats: i32,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub available_seats: i32,
    pub is_fully_booked: bool,
}

impl From<showtime_slot::Model> for SlotRecord {
    fn from(slot: showtime_slot::Model) -> Self {
        let available_seats = slot.available_seats();
        let is_fully_booked = slot.is_fully_booked();
        Self {
            id: slot.id,
            session_id: slot.session_id,
            movie_id: slot.movie_id,
            room_id: slot.room_id,
            start_time: slot.start_time,
            end_time: slot.end_time,
            base_price: slot.base_price,
            booked_seats: slot.booked_seats,
            total_seats: slot.total_seats,
            is_active: slot.is_active,
            notes: slot.notes,
            created_at: slot.created_at,
            updated_at: slot.updated_at,
            available_seats,
            is_fully_booked,
        }
    }
}

/// End of a screening that starts at `start_time` and runs `duration_minutes`.
#[must_use]
pub fn compute_end_time(start_time: DateTime<Utc>, duration_minutes: i32) -> DateTime<Utc> {
    start_time + Duration::minutes(i64::from(duration_minutes) + SLOT_BUFFER_MINUTES)
}

/// Whether half-open intervals `[a_start, a_end)` and `[b_start, b_end)` overlap.
#[must_use]
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Finds an active slot in the same room and session whose interval overlaps
/// `[start_time, end_time)`, ignoring `exclude_slot_id` (the slot being updated, if any).
pub async fn find_conflicting_slot<C>(
    db: &C,
    room_id: i64,
    session_id: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    exclude_slot_id: Option<i64>,
) -> Result<Option<showtime_slot::Model>>
where
    C: ConnectionTrait,
{
    let mut query = ShowtimeSlot::find()
        .filter(showtime_slot::Column::RoomId.eq(room_id))
        .filter(showtime_slot::Column::SessionId.eq(session_id))
        .filter(showtime_slot::Column::IsActive.eq(true))
        .filter(showtime_slot::Column::StartTime.lt(end_time))
        .filter(showtime_slot::Column::EndTime.gt(start_time));

    if let Some(excluded) = exclude_slot_id {
        query = query.filter(showtime_slot::Column::Id.ne(excluded));
    }

    query.one(db).await.map_err(Into::into)
}

/// Schedules a slot.
///
/// The movie, room and session must exist. The end time is derived from the movie's
/// runtime plus the buffer and the seat count is a snapshot of the room's capacity.
/// Fails with [`Error::SlotConflict`] if an active slot in the same room and session
/// overlaps the new one.
#[instrument(skip(db, clock), fields(session_id = args.session_id, room_id = args.room_id))]
pub async fn create_slot(
    db: &DatabaseConnection,
    clock: &impl Clock,
    args: CreateSlotArgs,
) -> Result<showtime_slot::Model> {
    let base_price = args.base_price.unwrap_or(0.0);
    if base_price < 0.0 || !base_price.is_finite() {
        return Err(Error::InvalidAmount { amount: base_price });
    }

    let movie = require_movie(db, args.movie_id).await?;
    let room = require_room(db, args.room_id).await?;
    get_session_by_id(db, args.session_id)
        .await?
        .ok_or(Error::SessionNotFound {
            id: args.session_id,
        })?;

    let start_time = args.start_time;
    let end_time = compute_end_time(start_time, movie.duration);
    if end_time <= start_time {
        return Err(Error::Validation {
            message: format!("Slot would end at {end_time}, not after its start {start_time}"),
        });
    }

    let _permit = acquire_creation_lock(args.room_id, args.session_id).await;

    let txn = db.begin().await?;

    if let Some(existing) = find_conflicting_slot(
        &txn,
        args.room_id,
        args.session_id,
        start_time,
        end_time,
        None,
    )
    .await?
    {
        debug!(conflicting_slot = existing.id, "Slot overlaps an existing screening");
        return Err(Error::SlotConflict {
            room_id: args.room_id,
            session_id: args.session_id,
        });
    }

    let now = clock.now();
    let slot = showtime_slot::ActiveModel {
        session_id: Set(args.session_id),
        movie_id: Set(args.movie_id),
        room_id: Set(args.room_id),
        start_time: Set(start_time),
        end_time: Set(end_time),
        base_price: Set(base_price),
        booked_seats: Set(0),
        total_seats: Set(room.capacity),
        is_active: Set(args.is_active.unwrap_or(true)),
        notes: Set(args.notes),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(Error::from)
    .map_err(|e| {
        if e.is_unique_violation() {
            Error::SlotConflict {
                room_id: args.room_id,
                session_id: args.session_id,
            }
        } else {
            e
        }
    })?;

    txn.commit().await?;

    info!(
        slot_id = slot.id,
        start = %slot.start_time,
        end = %slot.end_time,
        total_seats = slot.total_seats,
        "Slot scheduled"
    );
    Ok(slot)
}

/// Books (`delta > 0`) or releases (`delta < 0`) seats on a slot.
///
/// This is the only place occupancy changes. The delta is applied with one conditional
/// update so concurrent bookings cannot lose each other's writes; a delta that would take
/// `booked_seats` below zero or above `total_seats` is rejected and leaves the slot unchanged.
#[instrument(skip(db, clock))]
pub async fn update_booked_seats(
    db: &DatabaseConnection,
    clock: &impl Clock,
    slot_id: i64,
    delta: i32,
) -> Result<showtime_slot::Model> {
    for attempt in 1..=MAX_COUNTER_ATTEMPTS {
        if SEAT_COUNTER.apply(db, slot_id, delta, clock.now()).await? {
            let slot = find_slot(db, slot_id).await?;
            debug!(booked = slot.booked_seats, total = slot.total_seats, "Seats updated");
            return Ok(slot);
        }

        // The conditional update matched nothing: find out why
        let slot = find_slot(db, slot_id).await?;
        let requested = i64::from(slot.booked_seats) + i64::from(delta);
        if requested < 0 {
            return Err(Error::NegativeBookedSeats {
                slot_id,
                booked: slot.booked_seats,
                delta,
            });
        }
        if requested > i64::from(slot.total_seats) {
            return Err(Error::CapacityExceeded {
                slot_id,
                booked: slot.booked_seats,
                total: slot.total_seats,
                delta,
            });
        }

        // The row moved between the update and the read; try again
        warn!(attempt, "Seat counter changed concurrently, retrying");
    }

    Err(Error::Contended {
        entity: "showtime slot",
        id: slot_id,
    })
}

/// Bookable slots: in the future, active and not sold out, ordered by start time.
///
/// Optionally restricted to one movie and/or one UTC calendar day.
pub async fn find_available(
    db: &DatabaseConnection,
    clock: &impl Clock,
    movie_id: Option<i64>,
    date: Option<NaiveDate>,
) -> Result<Vec<showtime_slot::Model>> {
    let mut query = ShowtimeSlot::find()
        .filter(showtime_slot::Column::StartTime.gt(clock.now()))
        .filter(showtime_slot::Column::IsActive.eq(true))
        .filter(
            Expr::col(showtime_slot::Column::BookedSeats)
                .lt(Expr::col(showtime_slot::Column::TotalSeats)),
        );

    if let Some(movie_id) = movie_id {
        query = query.filter(showtime_slot::Column::MovieId.eq(movie_id));
    }

    if let Some(date) = date {
        let (start_of_day, next_day) = day_window(date);
        query = query
            .filter(showtime_slot::Column::StartTime.gte(start_of_day))
            .filter(showtime_slot::Column::StartTime.lt(next_day));
    }

    query
        .order_by_asc(showtime_slot::Column::StartTime)
        .order_by_asc(showtime_slot::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active slots of a session, ordered by start time.
pub async fn find_slots_by_session(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<Vec<showtime_slot::Model>> {
    ShowtimeSlot::find()
        .filter(showtime_slot::Column::SessionId.eq(session_id))
        .filter(showtime_slot::Column::IsActive.eq(true))
        .order_by_asc(showtime_slot::Column::StartTime)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active slots of a movie starting on the given UTC day, ordered by start time.
pub async fn find_slots_by_movie_and_date(
    db: &DatabaseConnection,
    movie_id: i64,
    date: NaiveDate,
) -> Result<Vec<showtime_slot::Model>> {
    let (start_of_day, next_day) = day_window(date);

    ShowtimeSlot::find()
        .filter(showtime_slot::Column::MovieId.eq(movie_id))
        .filter(showtime_slot::Column::StartTime.gte(start_of_day))
        .filter(showtime_slot::Column::StartTime.lt(next_day))
        .filter(showtime_slot::Column::IsActive.eq(true))
        .order_by_asc(showtime_slot::Column::StartTime)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a slot by ID.
pub async fn find_slot<C>(db: &C, slot_id: i64) -> Result<showtime_slot::Model>
where
    C: ConnectionTrait,
{
    ShowtimeSlot::find_by_id(slot_id)
        .one(db)
        .await?
        .ok_or(Error::SlotNotFound { id: slot_id })
}

/// Deletes a slot.
#[instrument(skip(db))]
pub async fn remove_slot(db: &DatabaseConnection, slot_id: i64) -> Result<()> {
    let slot = find_slot(db, slot_id).await?;
    slot.delete(db).await?;
    info!(slot_id, "Slot removed");
    Ok(())
}

/// `[00:00, next midnight)` of `date` in UTC, i.e. every instant up to 23:59:59.999...
fn day_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_of_day = date.and_time(chrono::NaiveTime::MIN).and_utc();
    (start_of_day, start_of_day + Duration::days(1))
}
