//! Unified error types for the scheduling and voucher core.
//!
//! Every business-rule violation is a typed variant carrying the entity it concerns,
//! so the transport layer can map it to a status code through [`Error::kind`].

use thiserror::Error;

/// Coarse classification of an [`Error`], used by callers to decide how to react
/// (e.g. retry a different room on `Conflict` versus surfacing a 404 on `NotFound`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity does not exist
    NotFound,
    /// Duplicate key or overlapping slot time
    Conflict,
    /// A seat counter bound would be violated
    CapacityExceeded,
    /// Usage cap exceeded or an otherwise unacceptable request
    BadRequest,
    /// Malformed input
    Validation,
    /// Store, configuration or environment failure
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Movie with ID {id} not found")]
    MovieNotFound { id: i64 },

    #[error("Room with ID {id} not found")]
    RoomNotFound { id: i64 },

    #[error("Session with ID {id} not found")]
    SessionNotFound { id: i64 },

    #[error("Showtime slot with ID {id} not found")]
    SlotNotFound { id: i64 },

    #[error("Voucher {key} not found")]
    VoucherNotFound { key: String },

    #[error("Time conflict detected. Room {room_id} is already booked during this time period.")]
    SlotConflict { room_id: i64, session_id: i64 },

    #[error("Session '{name}' already exists on {date}")]
    DuplicateSession { name: String, date: chrono::NaiveDate },

    #[error("Voucher code {code} already exists")]
    DuplicateVoucherCode { code: String },

    #[error("Room named '{name}' already exists")]
    DuplicateRoomName { name: String },

    #[error("Session {id} still has {slot_count} slot(s); remove them first")]
    SessionHasSlots { id: i64, slot_count: u64 },

    #[error("Cannot exceed total seats capacity: slot {slot_id} has {booked}/{total} booked, requested {delta:+}")]
    CapacityExceeded {
        slot_id: i64,
        booked: i32,
        total: i32,
        delta: i32,
    },

    #[error("Booked seats cannot be negative: slot {slot_id} has {booked} booked, requested {delta:+}")]
    NegativeBookedSeats { slot_id: i64, booked: i32, delta: i32 },

    #[error("Voucher usage limit exceeded for {code}")]
    UsageLimitExceeded { code: String },

    #[error("The {entity} {id} is being updated concurrently; try again")]
    Contended { entity: &'static str, id: i64 },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl Error {
    /// Classifies this error for the transport layer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MovieNotFound { .. }
            | Self::RoomNotFound { .. }
            | Self::SessionNotFound { .. }
            | Self::SlotNotFound { .. }
            | Self::VoucherNotFound { .. } => ErrorKind::NotFound,
            Self::SlotConflict { .. }
            | Self::DuplicateSession { .. }
            | Self::DuplicateVoucherCode { .. }
            | Self::DuplicateRoomName { .. }
            | Self::SessionHasSlots { .. }
            | Self::Contended { .. } => ErrorKind::Conflict,
            Self::CapacityExceeded { .. } | Self::NegativeBookedSeats { .. } => {
                ErrorKind::CapacityExceeded
            }
            Self::UsageLimitExceeded { .. } | Self::InvalidAmount { .. } => ErrorKind::BadRequest,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Config { .. } | Self::Database(_) | Self::EnvVar(_) => ErrorKind::Internal,
        }
    }

    /// Returns true when the underlying store rejected a write on a unique index.
    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(db_err)
                if matches!(db_err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_)))
        )
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
