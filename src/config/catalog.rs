//! Catalog configuration loading from config.toml
//!
//! The movies and rooms listed in config.toml seed the database at startup. Seeding
//! is idempotent: entries whose title or name already exists are skipped.

use crate::{
    core::{
        catalog::{create_movie, create_room, get_movie_by_title, get_room_by_name},
        clock::Clock,
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct CatalogConfig {
    /// Movies to seed
    #[serde(default)]
    pub movies: Vec<MovieConfig>,
    /// Screening rooms to seed
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,
}

/// Configuration for a single movie
#[derive(Debug, Deserialize, Clone)]
pub struct MovieConfig {
    /// Title, used as the seeding key
    pub title: String,
    /// Runtime in minutes
    pub duration: i32,
}

/// Configuration for a single room
#[derive(Debug, Deserialize, Clone)]
pub struct RoomConfig {
    /// Unique room name
    pub name: String,
    /// Number of seats
    pub capacity: i32,
}

/// How many catalog entries a seeding run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub movies_added: usize,
    pub rooms_added: usize,
}

/// Loads catalog configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads catalog configuration from `CATALOG_PATH`, or ./config.toml when unset
pub fn load_default_config() -> Result<CatalogConfig> {
    let path = std::env::var("CATALOG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}

/// Inserts every configured movie and room that is not in the database yet.
#[instrument(skip_all)]
pub async fn seed_catalog(
    db: &DatabaseConnection,
    clock: &impl Clock,
    config: &CatalogConfig,
) -> Result<SeedSummary> {
    info!(
        "Seeding catalog: {} movie(s), {} room(s) configured",
        config.movies.len(),
        config.rooms.len()
    );

    let mut summary = SeedSummary::default();

    for movie in &config.movies {
        if get_movie_by_title(db, &movie.title).await?.is_some() {
            debug!("Movie '{}' already exists, skipping", movie.title);
            continue;
        }
        create_movie(db, clock, &movie.title, movie.duration).await?;
        summary.movies_added += 1;
    }

    for room in &config.rooms {
        if get_room_by_name(db, &room.name).await?.is_some() {
            debug!("Room '{}' already exists, skipping", room.name);
            continue;
        }
        create_room(db, clock, &room.name, room.capacity).await?;
        summary.rooms_added += 1;
    }

    info!(
        movies_added = summary.movies_added,
        rooms_added = summary.rooms_added,
        "Catalog seeding finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::catalog::list_rooms;
    use crate::test_utils::*;

    const SAMPLE: &str = r#"
        [[movies]]
        title = "Dune: Part Two"
        duration = 166

        [[movies]]
        title = "Arrival"
        duration = 116

        [[rooms]]
        name = "Hall A"
        capacity = 120
    "#;

    #[test]
    fn test_parse_catalog_config() {
        let config: CatalogConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.movies.len(), 2);
        assert_eq!(config.movies[0].title, "Dune: Part Two");
        assert_eq!(config.movies[1].duration, 116);
        assert_eq!(config.rooms[0].name, "Hall A");
        assert_eq!(config.rooms[0].capacity, 120);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let config: CatalogConfig = toml::from_str("").unwrap();
        assert!(config.movies.is_empty());
        assert!(config.rooms.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = load_config("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_seed_catalog_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let config: CatalogConfig = toml::from_str(SAMPLE).unwrap();

        let first = seed_catalog(&db, &test_clock(), &config).await?;
        assert_eq!(
            first,
            SeedSummary {
                movies_added: 2,
                rooms_added: 1,
            }
        );

        let second = seed_catalog(&db, &test_clock(), &config).await?;
        assert_eq!(second, SeedSummary::default());
        assert_eq!(list_rooms(&db).await?.len(), 1);

        Ok(())
    }
}
