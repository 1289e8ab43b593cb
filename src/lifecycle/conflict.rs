//! Date-window conflict checks between approved reservations

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{Reservation, ReservationStatus},
};

/// Inclusive overlap of two calendar-day windows
pub fn windows_overlap(
    start: NaiveDate,
    end: NaiveDate,
    other_start: NaiveDate,
    other_end: NaiveDate,
) -> bool {
    start <= other_end && end >= other_start
}

/// Checks a candidate window for `item_id` against the approved reservations
/// in `candidates`.
///
/// `candidates` may be a superset (other items, other statuses); only approved
/// reservations of the same item other than `exclude` are considered.
pub fn check_overlap(
    item_id: i32,
    start: NaiveDate,
    end: NaiveDate,
    exclude: Option<i32>,
    candidates: &[Reservation],
) -> AppResult<()> {
    let conflicting: Vec<i32> = candidates
        .iter()
        .filter(|r| r.item_id == item_id && r.status == ReservationStatus::Approved)
        .filter(|r| Some(r.id) != exclude)
        .filter(|r| windows_overlap(start, end, r.start_date, r.end_date))
        .map(|r| r.id)
        .collect();

    if conflicting.is_empty() {
        return Ok(());
    }

    let ids = conflicting
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(AppError::Conflict(format!(
        "Asset {} is already reserved between {} and {} (reservation {})",
        item_id, start, end, ids
    )))
}
