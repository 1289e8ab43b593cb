//! Reservation model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::asset::Asset;
use super::enums::{Condition, CustodyEvent, ReservationStatus};

/// Reservation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub item_id: i32,
    pub requester_id: i32,
    /// First reserved day (inclusive)
    pub start_date: NaiveDate,
    /// Last reserved day (inclusive)
    pub end_date: NaiveDate,
    /// Day the item is expected back
    pub return_date: NaiveDate,
    pub status: ReservationStatus,
    pub purpose: Option<String>,
    /// Set once, when receipt is confirmed
    pub checkout_date: Option<DateTime<Utc>>,
    pub item_condition_on_receive: Option<Condition>,
    pub damage_notes: Option<String>,
    /// Set once, when return is confirmed
    pub returned_at: Option<DateTime<Utc>>,
    pub item_condition_on_return: Option<Condition>,
    pub return_notes: Option<String>,
    /// Incremented on every committed transition
    pub version: i32,
    pub crea_date: Option<DateTime<Utc>>,
    pub modif_date: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn is_checked_out(&self) -> bool {
        self.checkout_date.is_some()
    }

    pub fn is_returned(&self) -> bool {
        self.item_condition_on_return.is_some()
    }
}

/// Insert payload for a new pending reservation
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub item_id: i32,
    pub requester_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub return_date: NaiveDate,
    pub purpose: Option<String>,
}

/// Create reservation request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateReservation {
    pub item_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Defaults to `end_date`
    pub return_date: Option<NaiveDate>,
    pub purpose: Option<String>,
}

/// Condition captured at receipt or return
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConditionReport {
    pub condition: Condition,
    /// Required when condition is `damage`
    pub notes: Option<String>,
}

/// Reservation list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct ReservationQuery {
    pub item_id: Option<i32>,
    pub requester_id: Option<i32>,
    pub status: Option<ReservationStatus>,
    /// Only reservations whose window ends on or after this day
    pub from: Option<NaiveDate>,
    /// Only reservations whose window starts on or before this day
    pub to: Option<NaiveDate>,
}

impl ReservationQuery {
    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.item_id.map_or(true, |id| reservation.item_id == id)
            && self.requester_id.map_or(true, |id| reservation.requester_id == id)
            && self.status.map_or(true, |s| reservation.status == s)
            && self.from.map_or(true, |d| reservation.end_date >= d)
            && self.to.map_or(true, |d| reservation.start_date <= d)
    }
}

/// Immutable audit record written at a custody transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ConditionRecord {
    pub id: i32,
    pub reservation_id: i32,
    pub event_type: CustodyEvent,
    pub condition: Condition,
    pub notes: Option<String>,
    pub recorded_by: i32,
    pub recorded_at: DateTime<Utc>,
}

/// Audit record not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewConditionRecord {
    pub reservation_id: i32,
    pub event_type: CustodyEvent,
    pub condition: Condition,
    pub notes: Option<String>,
    pub recorded_by: i32,
    pub recorded_at: DateTime<Utc>,
}

/// Reservation together with its condition history
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub condition_records: Vec<ConditionRecord>,
}

/// Result of a custody transfer: the reservation and the asset it moved
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustodyOutcome {
    pub reservation: Reservation,
    pub asset: Asset,
}
