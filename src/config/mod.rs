/// Database configuration and connection management
pub mod database;

/// Catalog (movies and rooms) seeding from config.toml
pub mod catalog;
