//! Showtime session business logic.
//!
//! Sessions are named windows on a calendar day that group slots. Each (`name`, `date`)
//! pair exists at most once. Removing a session never cascades to its slots: the caller
//! must remove them first.

use crate::{
    core::clock::Clock,
    entities::{ShowtimeSession, ShowtimeSlot, showtime_session, showtime_slot},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::{LoaderTrait, QueryOrder, Set, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Arguments for [`create_session`].
#[derive(Debug, Clone)]
pub struct CreateSessionArgs {
    pub name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub description: Option<String>,
    /// Defaults to `true`
    pub is_active: Option<bool>,
}

/// A session together with the slots it owns, slots ordered by start time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionWithSlots {
    #[serde(flatten)]
    pub session: showtime_session::Model,
    pub slots: Vec<showtime_slot::Model>,
}

impl SessionWithSlots {
    fn new(session: showtime_session::Model, mut slots: Vec<showtime_slot::Model>) -> Self {
        slots.sort_by_key(|slot| (slot.start_time, slot.id));
        Self { session, slots }
    }
}

/// Creates a session, rejecting a duplicate (`name`, `date`).
#[instrument(skip(db, clock), fields(name = %args.name, date = %args.date))]
pub async fn create_session(
    db: &DatabaseConnection,
    clock: &impl Clock,
    args: CreateSessionArgs,
) -> Result<showtime_session::Model> {
    let name = args.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Session name cannot be empty".to_string(),
        });
    }

    if args.end_time <= args.start_time {
        return Err(Error::Validation {
            message: format!(
                "Session must end after it starts ({} - {})",
                args.start_time, args.end_time
            ),
        });
    }

    let existing = ShowtimeSession::find()
        .filter(showtime_session::Column::Name.eq(name.as_str()))
        .filter(showtime_session::Column::Date.eq(args.date))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::DuplicateSession {
            name,
            date: args.date,
        });
    }

    let now = clock.now();
    let session = showtime_session::ActiveModel {
        name: Set(name.clone()),
        date: Set(args.date),
        start_time: Set(args.start_time),
        end_time: Set(args.end_time),
        description: Set(args.description),
        is_active: Set(args.is_active.unwrap_or(true)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Error::from)
    .map_err(|e| {
        // Lost a race with a concurrent insert of the same (name, date)
        if e.is_unique_violation() {
            Error::DuplicateSession {
                name: name.clone(),
                date: args.date,
            }
        } else {
            e
        }
    })?;

    info!(session_id = session.id, "Session created");
    Ok(session)
}

/// All sessions with their slots, newest day first, then by start time.
pub async fn find_all_sessions(db: &DatabaseConnection) -> Result<Vec<SessionWithSlots>> {
    let sessions = ShowtimeSession::find()
        .order_by_desc(showtime_session::Column::Date)
        .order_by_asc(showtime_session::Column::StartTime)
        .order_by_asc(showtime_session::Column::Id)
        .all(db)
        .await?;

    attach_slots(db, sessions).await
}

/// Active sessions on exactly `date`, ordered by start time.
pub async fn find_sessions_by_date(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<Vec<SessionWithSlots>> {
    get_sessions_with_slots(db, Some(date)).await
}

/// Active sessions from today onwards, with their slots.
pub async fn find_upcoming_sessions(
    db: &DatabaseConnection,
    clock: &impl Clock,
) -> Result<Vec<SessionWithSlots>> {
    let today = clock.now().date_naive();

    let sessions = ShowtimeSession::find()
        .filter(showtime_session::Column::IsActive.eq(true))
        .filter(showtime_session::Column::Date.gte(today))
        .order_by_asc(showtime_session::Column::Date)
        .order_by_asc(showtime_session::Column::StartTime)
        .order_by_asc(showtime_session::Column::Id)
        .all(db)
        .await?;

    attach_slots(db, sessions).await
}

/// Active sessions, optionally restricted to one `date`, each with its slots.
///
/// Ordered by (session date, session start time, slot start time) ascending.
pub async fn get_sessions_with_slots(
    db: &DatabaseConnection,
    date: Option<NaiveDate>,
) -> Result<Vec<SessionWithSlots>> {
    let mut query = ShowtimeSession::find().filter(showtime_session::Column::IsActive.eq(true));

    if let Some(date) = date {
        query = query.filter(showtime_session::Column::Date.eq(date));
    }

    let sessions = query
        .order_by_asc(showtime_session::Column::Date)
        .order_by_asc(showtime_session::Column::StartTime)
        .order_by_asc(showtime_session::Column::Id)
        .all(db)
        .await?;

    attach_slots(db, sessions).await
}

/// Loads the slots of every session in one query, keeping the session order.
async fn attach_slots(
    db: &DatabaseConnection,
    sessions: Vec<showtime_session::Model>,
) -> Result<Vec<SessionWithSlots>> {
    let slots = sessions.load_many(ShowtimeSlot, db).await?;

    Ok(sessions
        .into_iter()
        .zip(slots)
        .map(|(session, slots)| SessionWithSlots::new(session, slots))
        .collect())
}

/// Finds a session by ID.
pub async fn get_session_by_id<C>(db: &C, session_id: i64) -> Result<Option<showtime_session::Model>>
where
    C: ConnectionTrait,
{
    ShowtimeSession::find_by_id(session_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a session by ID together with its slots.
pub async fn find_session(db: &DatabaseConnection, session_id: i64) -> Result<SessionWithSlots> {
    let session = get_session_by_id(db, session_id)
        .await?
        .ok_or(Error::SessionNotFound { id: session_id })?;
    let slots = session.find_related(ShowtimeSlot).all(db).await?;
    Ok(SessionWithSlots::new(session, slots))
}

/// Deletes a session. Refused while the session still owns slots.
#[instrument(skip(db))]
pub async fn remove_session(db: &DatabaseConnection, session_id: i64) -> Result<()> {
    let session = get_session_by_id(db, session_id)
        .await?
        .ok_or(Error::SessionNotFound { id: session_id })?;

    let slot_count = ShowtimeSlot::find()
        .filter(showtime_slot::Column::SessionId.eq(session_id))
        .count(db)
        .await?;
    if slot_count > 0 {
        return Err(Error::SessionHasSlots {
            id: session_id,
            slot_count,
        });
    }

    session.delete(db).await?;
    info!(session_id, "Session removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::slot::remove_slot;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_session_defaults_to_active() -> Result<()> {
        let db = setup_test_db().await?;

        let session = create_test_session(&db, "Morning Session", day(2025, 7, 5)).await?;

        assert_eq!(session.name, "Morning Session");
        assert_eq!(session.date, day(2025, 7, 5));
        assert!(session.is_active);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_name_and_date_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_session(&db, "Morning Session", day(2025, 7, 5)).await?;

        let err = create_test_session(&db, "Morning Session", day(2025, 7, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSession { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Same name on another day is fine
        create_test_session(&db, "Morning Session", day(2025, 7, 6)).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_session_window_must_be_ordered() -> Result<()> {
        let db = setup_test_db().await?;

        let err = create_session(
            &db,
            &test_clock(),
            CreateSessionArgs {
                name: "Backwards".to_string(),
                date: day(2025, 7, 5),
                start_time: hm(12, 0),
                end_time: hm(9, 0),
                description: None,
                is_active: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_sessions_with_slots_ordering_and_filters() -> Result<()> {
        let fx = setup_with_slot().await?;
        let db = &fx.db;

        // A second slot in the same session, earlier than the fixture slot
        create_test_slot(db, fx.session.id, fx.movie.id, fx.room.id, at(2025, 7, 5, 6, 0)).await?;

        let later_day = create_test_session(db, "Morning Session", day(2025, 7, 6)).await?;
        let inactive = create_session(
            db,
            &test_clock(),
            CreateSessionArgs {
                name: "Closed".to_string(),
                date: day(2025, 7, 5),
                start_time: hm(13, 0),
                end_time: hm(17, 0),
                description: None,
                is_active: Some(false),
            },
        )
        .await?;

        let all_days = get_sessions_with_slots(db, None).await?;
        let ids: Vec<i64> = all_days.iter().map(|s| s.session.id).collect();
        assert_eq!(ids, vec![fx.session.id, later_day.id]);
        assert!(!ids.contains(&inactive.id));

        let first = &all_days[0];
        assert_eq!(first.slots.len(), 2);
        assert!(first.slots[0].start_time < first.slots[1].start_time);

        let one_day = get_sessions_with_slots(db, Some(day(2025, 7, 6))).await?;
        assert_eq!(one_day.len(), 1);
        assert_eq!(one_day[0].session.id, later_day.id);
        assert!(one_day[0].slots.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_find_upcoming_sessions_skips_past_days() -> Result<()> {
        let db = setup_test_db().await?;
        // test clock is 2025-07-01
        create_test_session(&db, "Old", day(2025, 6, 30)).await?;
        let upcoming = create_test_session(&db, "New", day(2025, 7, 1)).await?;

        let sessions = find_upcoming_sessions(&db, &test_clock()).await?;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session.id, upcoming.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_all_sessions_newest_day_first() -> Result<()> {
        let db = setup_test_db().await?;
        let older = create_test_session(&db, "A", day(2025, 7, 5)).await?;
        let newer = create_test_session(&db, "B", day(2025, 7, 6)).await?;

        let sessions = find_all_sessions(&db).await?;
        assert_eq!(sessions[0].session.id, newer.id);
        assert_eq!(sessions[1].session.id, older.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_session_requires_slots_removed_first() -> Result<()> {
        let fx = setup_with_slot().await?;

        let err = remove_session(&fx.db, fx.session.id).await.unwrap_err();
        assert!(matches!(err, Error::SessionHasSlots { slot_count: 1, .. }));

        remove_slot(&fx.db, fx.slot.id).await?;
        remove_session(&fx.db, fx.session.id).await?;

        let err = find_session(&fx.db, fx.session.id).await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound { .. }));

        Ok(())
    }
}
