//! Catalog business logic - the movie and room lookups the scheduler depends on.
//!
//! The scheduler only needs a movie's runtime and a room's capacity; this module
//! provides just enough create/lookup surface to supply them.

use crate::{
    core::clock::Clock,
    entities::{Movie, Room, movie, room},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Adds a movie to the catalog.
///
/// Rejects empty titles and non-positive runtimes; a slot's end time would otherwise
/// not be after its start.
pub async fn create_movie(
    db: &DatabaseConnection,
    clock: &impl Clock,
    title: &str,
    duration: i32,
) -> Result<movie::Model> {
    if title.trim().is_empty() {
        return Err(Error::Validation {
            message: "Movie title cannot be empty".to_string(),
        });
    }

    if duration <= 0 {
        return Err(Error::Validation {
            message: format!("Movie duration must be positive, got {duration}"),
        });
    }

    let movie = movie::ActiveModel {
        title: Set(title.trim().to_string()),
        duration: Set(duration),
        created_at: Set(clock.now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(movie_id = movie.id, title = %movie.title, "Movie added to catalog");
    Ok(movie)
}

/// Finds a movie by its unique ID.
pub async fn get_movie_by_id<C>(db: &C, movie_id: i64) -> Result<Option<movie::Model>>
where
    C: ConnectionTrait,
{
    Movie::find_by_id(movie_id).one(db).await.map_err(Into::into)
}

/// Finds a movie by its exact title.
pub async fn get_movie_by_title(
    db: &DatabaseConnection,
    title: &str,
) -> Result<Option<movie::Model>> {
    Movie::find()
        .filter(movie::Column::Title.eq(title))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_movie_by_id`], but a missing movie is an error.
pub async fn require_movie<C>(db: &C, movie_id: i64) -> Result<movie::Model>
where
    C: ConnectionTrait,
{
    get_movie_by_id(db, movie_id)
        .await?
        .ok_or(Error::MovieNotFound { id: movie_id })
}

/// Registers a screening room. Room names are unique.
pub async fn create_room(
    db: &DatabaseConnection,
    clock: &impl Clock,
    name: &str,
    capacity: i32,
) -> Result<room::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Room name cannot be empty".to_string(),
        });
    }

    if capacity < 0 {
        return Err(Error::Validation {
            message: format!("Room capacity cannot be negative, got {capacity}"),
        });
    }

    if get_room_by_name(db, name).await?.is_some() {
        return Err(Error::DuplicateRoomName {
            name: name.to_string(),
        });
    }

    let room = room::ActiveModel {
        name: Set(name.to_string()),
        capacity: Set(capacity),
        created_at: Set(clock.now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Error::from)
    .map_err(|e| {
        if e.is_unique_violation() {
            Error::DuplicateRoomName {
                name: name.to_string(),
            }
        } else {
            e
        }
    })?;

    info!(room_id = room.id, name = %room.name, capacity, "Room registered");
    Ok(room)
}

/// Finds a room by its unique ID.
pub async fn get_room_by_id<C>(db: &C, room_id: i64) -> Result<Option<room::Model>>
where
    C: ConnectionTrait,
{
    Room::find_by_id(room_id).one(db).await.map_err(Into::into)
}

/// Finds a room by its unique name.
pub async fn get_room_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<room::Model>> {
    Room::find()
        .filter(room::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_room_by_id`], but a missing room is an error.
pub async fn require_room<C>(db: &C, room_id: i64) -> Result<room::Model>
where
    C: ConnectionTrait,
{
    get_room_by_id(db, room_id)
        .await?
        .ok_or(Error::RoomNotFound { id: room_id })
}

/// Changes a room's capacity. Slots already created keep the capacity they were created with.
pub async fn update_room_capacity(
    db: &DatabaseConnection,
    room_id: i64,
    capacity: i32,
) -> Result<room::Model> {
    if capacity < 0 {
        return Err(Error::Validation {
            message: format!("Room capacity cannot be negative, got {capacity}"),
        });
    }

    let room = require_room(db, room_id).await?;
    let mut active: room::ActiveModel = room.into();
    active.capacity = Set(capacity);
    active.update(db).await.map_err(Into::into)
}

/// Lists all rooms ordered by name.
pub async fn list_rooms(db: &DatabaseConnection) -> Result<Vec<room::Model>> {
    Room::find()
        .order_by_asc(room::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_movie_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_movie(&db, &test_clock(), "   ", 120).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = create_movie(&db, &test_clock(), "Dune", 0).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_require_movie() -> Result<()> {
        let db = setup_test_db().await?;

        let movie = create_test_movie(&db, "Dune", 155).await?;
        assert_eq!(movie.duration, 155);
        assert_eq!(movie.created_at, test_now());

        let found = require_movie(&db, movie.id).await?;
        assert_eq!(found, movie);

        let by_title = get_movie_by_title(&db, "Dune").await?;
        assert_eq!(by_title.unwrap().id, movie.id);

        let missing = require_movie(&db, 999).await.unwrap_err();
        assert!(matches!(missing, Error::MovieNotFound { id: 999 }));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_room_name_conflicts() -> Result<()> {
        let db = setup_test_db().await?;

        let room = create_test_room(&db, "Hall 1", 100).await?;
        assert_eq!(room.created_at, test_now());
        let err = create_test_room(&db, "Hall 1", 50).await.unwrap_err();

        assert!(matches!(err, Error::DuplicateRoomName { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(list_rooms(&db).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_room_capacity() -> Result<()> {
        let db = setup_test_db().await?;
        let room = create_test_room(&db, "Hall 2", 80).await?;

        let resized = update_room_capacity(&db, room.id, 120).await?;
        assert_eq!(resized.capacity, 120);

        let err = update_room_capacity(&db, 999, 10).await.unwrap_err();
        assert!(matches!(err, Error::RoomNotFound { id: 999 }));

        Ok(())
    }
}
