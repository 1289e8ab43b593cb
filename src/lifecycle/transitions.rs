//! Reservation state machine.
//!
//! Each function checks that a transition is allowed and returns a
//! [`Transition`] describing every write it implies. Nothing is written here;
//! a store applies the whole transition atomically or not at all. A
//! `Transition` can only be built by this module, which is what keeps asset
//! status out of reach of any other write path.

use chrono::{DateTime, NaiveDate, Utc};

use super::conflict::check_overlap;
use super::status::{next_status, StatusEvent};
use crate::{
    error::{AppError, AppResult},
    models::{
        Asset, AssetStatus, Condition, ConditionReport, CustodyEvent, NewConditionRecord,
        Reservation, ReservationStatus,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Approve,
    Reject,
    Cancel,
    ConfirmReceipt,
    ConfirmReturn,
    CompleteMaintenance,
    Retire,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Approve => "approve",
            TransitionKind::Reject => "reject",
            TransitionKind::Cancel => "cancel",
            TransitionKind::ConfirmReceipt => "confirm_receipt",
            TransitionKind::ConfirmReturn => "confirm_return",
            TransitionKind::CompleteMaintenance => "complete_maintenance",
            TransitionKind::Retire => "retire",
        }
    }
}

/// New asset status, guarded by the status it is expected to replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetStatusChange {
    pub asset_id: i32,
    pub from: AssetStatus,
    pub to: AssetStatus,
}

/// Every write implied by one lifecycle transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    kind: TransitionKind,
    reservation: Option<Reservation>,
    expected_version: i32,
    asset: Option<AssetStatusChange>,
    record: Option<NewConditionRecord>,
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    /// Reservation as it must look after the commit
    pub fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    /// Version the stored reservation must still carry for the commit to apply
    pub fn expected_version(&self) -> i32 {
        self.expected_version
    }

    pub fn asset_change(&self) -> Option<AssetStatusChange> {
        self.asset
    }

    pub fn condition_record(&self) -> Option<&NewConditionRecord> {
        self.record.as_ref()
    }

    fn for_reservation(kind: TransitionKind, current: &Reservation, next: Reservation) -> Self {
        Self {
            kind,
            reservation: Some(next),
            expected_version: current.version,
            asset: None,
            record: None,
        }
    }

    fn with_asset(mut self, asset: &Asset, event: StatusEvent) -> Self {
        let to = next_status(asset.status, event);
        if to != asset.status {
            self.asset = Some(AssetStatusChange {
                asset_id: asset.id,
                from: asset.status,
                to,
            });
        }
        self
    }
}

/// Validates a requested window and returns the effective return date
pub fn validate_window(
    start: NaiveDate,
    end: NaiveDate,
    return_date: Option<NaiveDate>,
) -> AppResult<NaiveDate> {
    if start > end {
        return Err(AppError::Validation(format!(
            "start_date {} is after end_date {}",
            start, end
        )));
    }
    let return_date = return_date.unwrap_or(end);
    if return_date < start {
        return Err(AppError::Validation(format!(
            "return_date {} is before start_date {}",
            return_date, start
        )));
    }
    Ok(return_date)
}

/// Checks that a new reservation may target `asset`
pub fn ensure_reservable(asset: &Asset) -> AppResult<()> {
    if !asset.is_equipment {
        return Err(AppError::Validation(format!(
            "Asset {} is not equipment and cannot be reserved",
            asset.id
        )));
    }
    if asset.status == AssetStatus::OutOfService {
        return Err(AppError::State(format!("Asset {} is out of service", asset.id)));
    }
    Ok(())
}

/// Notes attached to a condition report; required and non-blank for damage
fn report_notes(report: &ConditionReport) -> AppResult<Option<String>> {
    let notes = report
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    if report.condition == Condition::Damage && notes.is_none() {
        return Err(AppError::Validation(
            "Please describe the damage or missing items".to_string(),
        ));
    }
    Ok(notes)
}

fn ensure_status(reservation: &Reservation, expected: ReservationStatus) -> AppResult<()> {
    if reservation.status == expected {
        Ok(())
    } else if reservation.status.is_terminal() {
        Err(AppError::State(format!(
            "Reservation {} is already {} and can no longer change",
            reservation.id, reservation.status
        )))
    } else {
        Err(AppError::State(format!(
            "Reservation {} is {}, expected {}",
            reservation.id, reservation.status, expected
        )))
    }
}

fn ensure_same_item(reservation: &Reservation, asset: &Asset) -> AppResult<()> {
    if reservation.item_id == asset.id {
        Ok(())
    } else {
        Err(AppError::Internal(format!(
            "Reservation {} belongs to asset {}, not {}",
            reservation.id, reservation.item_id, asset.id
        )))
    }
}

fn advanced(reservation: &Reservation, at: DateTime<Utc>) -> Reservation {
    let mut next = reservation.clone();
    next.version = reservation.version + 1;
    next.modif_date = Some(at);
    next
}

/// pending → approved, provided no approved reservation in `approved` overlaps
pub fn approve(
    reservation: &Reservation,
    asset: &Asset,
    approved: &[Reservation],
    at: DateTime<Utc>,
) -> AppResult<Transition> {
    ensure_same_item(reservation, asset)?;
    ensure_status(reservation, ReservationStatus::Pending)?;
    if asset.status == AssetStatus::OutOfService {
        return Err(AppError::State(format!("Asset {} is out of service", asset.id)));
    }
    check_overlap(
        reservation.item_id,
        reservation.start_date,
        reservation.end_date,
        Some(reservation.id),
        approved,
    )?;

    let mut next = advanced(reservation, at);
    next.status = ReservationStatus::Approved;
    Ok(Transition::for_reservation(TransitionKind::Approve, reservation, next)
        .with_asset(asset, StatusEvent::Approved))
}

/// pending → rejected
pub fn reject(reservation: &Reservation, at: DateTime<Utc>) -> AppResult<Transition> {
    ensure_status(reservation, ReservationStatus::Pending)?;
    let mut next = advanced(reservation, at);
    next.status = ReservationStatus::Rejected;
    Ok(Transition::for_reservation(TransitionKind::Reject, reservation, next))
}

/// pending → cancelled, by the requester only
pub fn cancel(
    reservation: &Reservation,
    requester_id: i32,
    at: DateTime<Utc>,
) -> AppResult<Transition> {
    if reservation.requester_id != requester_id {
        return Err(AppError::Authorization(format!(
            "Only the requester may cancel reservation {}",
            reservation.id
        )));
    }
    ensure_status(reservation, ReservationStatus::Pending)?;
    let mut next = advanced(reservation, at);
    next.status = ReservationStatus::Cancelled;
    Ok(Transition::for_reservation(TransitionKind::Cancel, reservation, next))
}

/// Records pickup: reservation stays approved, asset goes in use
pub fn confirm_receipt(
    reservation: &Reservation,
    asset: &Asset,
    report: &ConditionReport,
    actor_id: i32,
    at: DateTime<Utc>,
) -> AppResult<Transition> {
    ensure_same_item(reservation, asset)?;
    ensure_status(reservation, ReservationStatus::Approved)?;
    if reservation.is_checked_out() {
        return Err(AppError::State(format!(
            "Receipt of reservation {} was already confirmed",
            reservation.id
        )));
    }
    match asset.status {
        AssetStatus::InUse => {
            return Err(AppError::State(format!(
                "Asset {} is still in use under another reservation",
                asset.id
            )))
        }
        AssetStatus::Maintenance | AssetStatus::OutOfService => {
            return Err(AppError::State(format!(
                "Asset {} is {} and cannot be handed out",
                asset.id, asset.status
            )))
        }
        AssetStatus::Available | AssetStatus::Reserved => {}
    }
    let notes = report_notes(report)?;

    let mut next = advanced(reservation, at);
    next.checkout_date = Some(at);
    next.item_condition_on_receive = Some(report.condition);
    next.damage_notes = notes.clone();

    let mut transition =
        Transition::for_reservation(TransitionKind::ConfirmReceipt, reservation, next)
            .with_asset(asset, StatusEvent::Received);
    transition.record = Some(NewConditionRecord {
        reservation_id: reservation.id,
        event_type: CustodyEvent::Receipt,
        condition: report.condition,
        notes,
        recorded_by: actor_id,
        recorded_at: at,
    });
    Ok(transition)
}

/// approved → completed; asset becomes available or goes to maintenance
pub fn confirm_return(
    reservation: &Reservation,
    asset: &Asset,
    report: &ConditionReport,
    actor_id: i32,
    at: DateTime<Utc>,
) -> AppResult<Transition> {
    ensure_same_item(reservation, asset)?;
    if reservation.is_returned() {
        return Err(AppError::State(format!(
            "Return of reservation {} was already confirmed",
            reservation.id
        )));
    }
    ensure_status(reservation, ReservationStatus::Approved)?;
    let event = if reservation.is_checked_out() {
        StatusEvent::Returned(report.condition)
    } else if asset.status == AssetStatus::InUse {
        return Err(AppError::State(format!(
            "Reservation {} was never picked up and asset {} is in use under another reservation",
            reservation.id, asset.id
        )));
    } else {
        StatusEvent::Released(report.condition)
    };
    let notes = report_notes(report)?;

    let mut next = advanced(reservation, at);
    next.status = ReservationStatus::Completed;
    next.returned_at = Some(at);
    next.item_condition_on_return = Some(report.condition);
    next.return_notes = notes.clone();

    let mut transition =
        Transition::for_reservation(TransitionKind::ConfirmReturn, reservation, next)
            .with_asset(asset, event);
    transition.record = Some(NewConditionRecord {
        reservation_id: reservation.id,
        event_type: CustodyEvent::Return,
        condition: report.condition,
        notes,
        recorded_by: actor_id,
        recorded_at: at,
    });
    Ok(transition)
}

fn asset_only(kind: TransitionKind, asset: &Asset, event: StatusEvent) -> Transition {
    Transition {
        kind,
        reservation: None,
        expected_version: 0,
        asset: None,
        record: None,
    }
    .with_asset(asset, event)
}

/// Maintenance → Available
pub fn complete_maintenance(asset: &Asset) -> AppResult<Transition> {
    if asset.status != AssetStatus::Maintenance {
        return Err(AppError::State(format!(
            "Asset {} is {}, not under maintenance",
            asset.id, asset.status
        )));
    }
    Ok(asset_only(
        TransitionKind::CompleteMaintenance,
        asset,
        StatusEvent::MaintenanceCompleted,
    ))
}

/// Any status except in use → OutOfService
pub fn retire(asset: &Asset) -> AppResult<Transition> {
    match asset.status {
        AssetStatus::InUse => Err(AppError::State(format!(
            "Asset {} is in use and cannot be retired",
            asset.id
        ))),
        AssetStatus::OutOfService => Err(AppError::State(format!(
            "Asset {} is already out of service",
            asset.id
        ))),
        _ => Ok(asset_only(TransitionKind::Retire, asset, StatusEvent::Retired)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::testing::{asset, reservation};
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn report(condition: Condition, notes: Option<&str>) -> ConditionReport {
        ConditionReport {
            condition,
            notes: notes.map(str::to_string),
        }
    }

    fn approved(id: i32) -> Reservation {
        let mut r = reservation(id, 1, day(1), day(5));
        r.status = ReservationStatus::Approved;
        r
    }

    #[test]
    fn test_validate_window() {
        assert_eq!(validate_window(day(1), day(5), None).unwrap(), day(5));
        assert_eq!(validate_window(day(1), day(5), Some(day(6))).unwrap(), day(6));
        assert_eq!(validate_window(day(3), day(3), None).unwrap(), day(3));
        assert!(matches!(
            validate_window(day(5), day(1), None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_window(day(2), day(5), Some(day(1))),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_ensure_reservable() {
        let mut a = asset(1);
        assert!(ensure_reservable(&a).is_ok());
        a.is_equipment = false;
        assert!(matches!(ensure_reservable(&a), Err(AppError::Validation(_))));
        a.is_equipment = true;
        a.status = AssetStatus::OutOfService;
        assert!(matches!(ensure_reservable(&a), Err(AppError::State(_))));
    }

    #[test]
    fn test_approve_marks_asset_reserved() {
        let r = reservation(1, 1, day(1), day(5));
        let t = approve(&r, &asset(1), &[], now()).unwrap();
        let next = t.reservation().unwrap();
        assert_eq!(next.status, ReservationStatus::Approved);
        assert_eq!(next.version, r.version + 1);
        assert_eq!(t.expected_version(), r.version);
        assert_eq!(
            t.asset_change(),
            Some(AssetStatusChange {
                asset_id: 1,
                from: AssetStatus::Available,
                to: AssetStatus::Reserved
            })
        );
        assert!(t.condition_record().is_none());
    }

    #[test]
    fn test_approve_conflict() {
        let r = reservation(2, 1, day(3), day(4));
        let err = approve(&r, &asset(1), &[approved(1)], now()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_approve_requires_pending() {
        let err = approve(&approved(1), &asset(1), &[], now()).unwrap_err();
        assert!(matches!(err, AppError::State(_)));
    }

    #[test]
    fn test_cancel_by_other_user_is_forbidden() {
        let r = reservation(1, 1, day(1), day(5));
        let err = cancel(&r, r.requester_id + 1, now()).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
        let t = cancel(&r, r.requester_id, now()).unwrap();
        assert_eq!(t.reservation().unwrap().status, ReservationStatus::Cancelled);
        assert!(t.asset_change().is_none());
    }

    #[test]
    fn test_cancel_after_approval_is_state_error() {
        let r = approved(1);
        assert!(matches!(cancel(&r, r.requester_id, now()), Err(AppError::State(_))));
    }

    #[test]
    fn test_receipt_damage_requires_notes() {
        let r = approved(1);
        let mut a = asset(1);
        a.status = AssetStatus::Reserved;
        for notes in [None, Some(""), Some("   ")] {
            let err = confirm_receipt(&r, &a, &report(Condition::Damage, notes), 9, now())
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn test_receipt_sets_fields_and_record() {
        let r = approved(1);
        let mut a = asset(1);
        a.status = AssetStatus::Reserved;
        let t = confirm_receipt(&r, &a, &report(Condition::Damage, Some(" scratched ")), 9, now())
            .unwrap();
        let next = t.reservation().unwrap();
        assert_eq!(next.status, ReservationStatus::Approved);
        assert_eq!(next.checkout_date, Some(now()));
        assert_eq!(next.item_condition_on_receive, Some(Condition::Damage));
        assert_eq!(next.damage_notes.as_deref(), Some("scratched"));
        assert_eq!(t.asset_change().unwrap().to, AssetStatus::InUse);

        let record = t.condition_record().unwrap();
        assert_eq!(record.event_type, CustodyEvent::Receipt);
        assert_eq!(record.recorded_by, 9);
    }

    #[test]
    fn test_receipt_is_write_once() {
        let mut r = approved(1);
        r.checkout_date = Some(now());
        r.item_condition_on_receive = Some(Condition::Good);
        let mut a = asset(1);
        a.status = AssetStatus::InUse;
        let err = confirm_receipt(&r, &a, &report(Condition::Good, None), 9, now()).unwrap_err();
        assert!(matches!(err, AppError::State(_)));
    }

    #[test]
    fn test_receipt_blocked_while_asset_busy() {
        let r = approved(2);
        for status in [AssetStatus::InUse, AssetStatus::Maintenance, AssetStatus::OutOfService] {
            let mut a = asset(1);
            a.status = status;
            let err = confirm_receipt(&r, &a, &report(Condition::Good, None), 9, now())
                .unwrap_err();
            assert!(matches!(err, AppError::State(_)));
        }
    }

    #[test]
    fn test_return_outcomes() {
        let mut r = approved(1);
        r.checkout_date = Some(now());
        let mut a = asset(1);
        a.status = AssetStatus::InUse;

        let good = confirm_return(&r, &a, &report(Condition::Good, None), 9, now()).unwrap();
        assert_eq!(good.reservation().unwrap().status, ReservationStatus::Completed);
        assert_eq!(good.asset_change().unwrap().to, AssetStatus::Available);

        let damaged =
            confirm_return(&r, &a, &report(Condition::Damage, Some("cracked lens")), 9, now())
                .unwrap();
        assert_eq!(damaged.asset_change().unwrap().to, AssetStatus::Maintenance);
        assert_eq!(
            damaged.condition_record().unwrap().notes.as_deref(),
            Some("cracked lens")
        );
    }

    #[test]
    fn test_return_without_pickup_only_releases_the_hold() {
        let r = approved(1);
        let mut a = asset(1);

        a.status = AssetStatus::Reserved;
        let t = confirm_return(&r, &a, &report(Condition::Good, None), 9, now()).unwrap();
        assert_eq!(t.reservation().unwrap().status, ReservationStatus::Completed);
        assert_eq!(t.asset_change().unwrap().to, AssetStatus::Available);

        a.status = AssetStatus::Maintenance;
        let t = confirm_return(&r, &a, &report(Condition::Good, None), 9, now()).unwrap();
        assert!(t.asset_change().is_none());

        a.status = AssetStatus::InUse;
        let err = confirm_return(&r, &a, &report(Condition::Good, None), 9, now()).unwrap_err();
        assert!(matches!(err, AppError::State(_)));
    }

    #[test]
    fn test_terminal_states_refuse_every_transition() {
        let a = asset(1);
        for status in [
            ReservationStatus::Rejected,
            ReservationStatus::Cancelled,
            ReservationStatus::Completed,
        ] {
            let mut r = reservation(1, 1, day(1), day(5));
            r.status = status;
            let good = report(Condition::Good, None);
            assert!(matches!(approve(&r, &a, &[], now()), Err(AppError::State(_))));
            assert!(matches!(reject(&r, now()), Err(AppError::State(_))));
            assert!(matches!(cancel(&r, r.requester_id, now()), Err(AppError::State(_))));
            assert!(matches!(
                confirm_receipt(&r, &a, &good, 9, now()),
                Err(AppError::State(_))
            ));
            assert!(matches!(
                confirm_return(&r, &a, &good, 9, now()),
                Err(AppError::State(_))
            ));
            let msg = reject(&r, now()).unwrap_err().to_string();
            assert!(msg.contains("can no longer change"), "{}", msg);
        }
    }

    #[test]
    fn test_maintenance_and_retirement() {
        let mut a = asset(1);
        assert!(matches!(complete_maintenance(&a), Err(AppError::State(_))));
        a.status = AssetStatus::Maintenance;
        let t = complete_maintenance(&a).unwrap();
        assert_eq!(t.asset_change().unwrap().to, AssetStatus::Available);
        assert!(t.reservation().is_none());

        let t = retire(&a).unwrap();
        assert_eq!(t.asset_change().unwrap().to, AssetStatus::OutOfService);
        a.status = AssetStatus::InUse;
        assert!(matches!(retire(&a), Err(AppError::State(_))));
    }
}
