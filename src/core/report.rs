//! Occupancy report generation.
//!
//! This module summarises how full a session's screenings are. All functions return
//! structured data; formatting helpers produce plain text for logs and terminals.

use crate::{
    core::session::find_session,
    entities::{showtime_session, showtime_slot},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Seat usage of a single slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotOccupancy {
    /// The slot being reported on
    pub slot_id: i64,
    /// Movie screened in the slot
    pub movie_id: i64,
    /// Room the slot occupies
    pub room_id: i64,
    /// Screening start
    pub start_time: DateTime<Utc>,
    /// Seats sold
    pub booked_seats: i32,
    /// Seat capacity snapshotted at creation
    pub total_seats: i32,
    /// `booked_seats / total_seats` as a percentage
    pub occupancy_percent: f64,
}

impl From<&showtime_slot::Model> for SlotOccupancy {
    fn from(slot: &showtime_slot::Model) -> Self {
        Self {
            slot_id: slot.id,
            movie_id: slot.movie_id,
            room_id: slot.room_id,
            start_time: slot.start_time,
            booked_seats: slot.booked_seats,
            total_seats: slot.total_seats,
            occupancy_percent: calculate_occupancy(slot.booked_seats, slot.total_seats),
        }
    }
}

/// Occupancy of every slot in a session plus the session-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOccupancyReport {
    /// The session being reported on
    pub session: showtime_session::Model,
    /// Per-slot figures, ordered by start time
    pub slots: Vec<SlotOccupancy>,
    /// Seats sold across all slots
    pub booked_seats: i64,
    /// Seat capacity across all slots
    pub total_seats: i64,
    /// Session-wide occupancy percentage
    pub occupancy_percent: f64,
}

/// Generates the occupancy report for a session.
///
/// # Arguments
/// * `db` - Database connection
/// * `session_id` - ID of the session to report on
///
/// # Returns
/// A `SessionOccupancyReport`; a session without slots reports 0 seats and 0%
pub async fn session_occupancy_report(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<SessionOccupancyReport> {
    let found = find_session(db, session_id).await?;

    let slots: Vec<SlotOccupancy> = found.slots.iter().map(SlotOccupancy::from).collect();
    let booked_seats: i64 = slots.iter().map(|s| i64::from(s.booked_seats)).sum();
    let total_seats: i64 = slots.iter().map(|s| i64::from(s.total_seats)).sum();

    // Cast safety: seat totals are far below 2^52
    #[allow(clippy::cast_precision_loss)]
    let occupancy_percent = percent_of(booked_seats as f64, total_seats as f64);

    Ok(SessionOccupancyReport {
        session: found.session,
        slots,
        booked_seats,
        total_seats,
        occupancy_percent,
    })
}

/// Calculates the occupancy percentage of a slot.
///
/// Returns 0 for a zero-capacity slot instead of dividing by zero.
#[must_use]
pub fn calculate_occupancy(booked_seats: i32, total_seats: i32) -> f64 {
    percent_of(f64::from(booked_seats), f64::from(total_seats))
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }

    (part / whole) * 100.0
}

/// Generates an occupancy bar string for visual representation.
///
/// Creates a text-based bar like: `[████████░░] 80.0%`
///
/// # Arguments
/// * `occupancy_percent` - Occupancy percentage (0-100)
/// * `bar_length` - Length of the bar in characters (default 10)
#[must_use]
pub fn format_occupancy_bar(occupancy_percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = occupancy_percent.clamp(0.0, 100.0);

    // Cast safety: clamped ∈ [0, 100] and length is small, so the result is in [0, length]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!(
        "[{}{}] {occupancy_percent:.1}%",
        "█".repeat(filled),
        "░".repeat(empty)
    )
}

/// One-line summary of a slot, e.g. `09:00 | room 2 | 45/100 seats`.
#[must_use]
pub fn format_slot_summary(slot: &SlotOccupancy) -> String {
    format!(
        "{} | room {} | {}/{} seats",
        slot.start_time.format("%H:%M"),
        slot.room_id,
        slot.booked_seats,
        slot.total_seats
    )
}
