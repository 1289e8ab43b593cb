//! Lifecycle coordinator: every reservation transition and every asset status
//! change goes through here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OwnedMutexGuard;

use super::notifications::{Notifier, ReservationEvent};
use crate::{
    error::{AppError, AppResult},
    lifecycle::{check_overlap, due, transitions, ReferenceCalendar, Transition},
    models::{
        Asset, ConditionReport, CreateReservation, CustodyOutcome, NewReservation, Reservation,
        ReservationDetails, ReservationQuery, ReservationStatus,
    },
    repository::CustodyStore,
};

/// One async mutex per asset. Transitions on the same asset are serialized,
/// transitions on different assets never wait on each other.
#[derive(Default)]
pub struct ItemLocks {
    locks: Mutex<HashMap<i32, Arc<tokio::sync::Mutex<()>>>>,
}

impl ItemLocks {
    pub async fn acquire(&self, item_id: i32) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // An entry only the map references has no holder and no waiter
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(item_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn CustodyStore>,
    calendar: ReferenceCalendar,
    locks: Arc<ItemLocks>,
    notifier: Notifier,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn CustodyStore>, calendar: ReferenceCalendar, notifier: Notifier) -> Self {
        Self {
            store,
            calendar,
            locks: Arc::new(ItemLocks::default()),
            notifier,
        }
    }

    /// Today in the reference timezone
    pub fn today(&self) -> NaiveDate {
        self.calendar.today()
    }

    // ---- Queries ----

    pub async fn get_reservation(&self, id: i32) -> AppResult<ReservationDetails> {
        let reservation = self.store.get_reservation(id).await?;
        let condition_records = self.store.list_condition_records(id).await?;
        Ok(ReservationDetails {
            reservation,
            condition_records,
        })
    }

    pub async fn list_reservations(&self, query: &ReservationQuery) -> AppResult<Vec<Reservation>> {
        self.store.list_reservations(query).await
    }

    /// Fails with a conflict when `[start, end]` overlaps an approved
    /// reservation of `item_id` other than `exclude`
    pub async fn check_overlap(
        &self,
        item_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<i32>,
    ) -> AppResult<()> {
        let approved = self.store.approved_in_window(item_id, start, end).await?;
        check_overlap(item_id, start, end, exclude, &approved)
    }

    /// Approved reservations waiting for pickup on `date` (default: today)
    pub async fn list_pickup_due(&self, date: Option<NaiveDate>) -> AppResult<Vec<Reservation>> {
        let today = date.unwrap_or_else(|| self.today());
        let query = ReservationQuery {
            status: Some(ReservationStatus::Approved),
            from: Some(today),
            to: Some(today),
            ..Default::default()
        };
        let rows = self.store.list_reservations(&query).await?;
        Ok(due::pickup_due(rows, today))
    }

    /// Approved reservations whose return date has arrived by `date` (default: today)
    pub async fn list_return_due(&self, date: Option<NaiveDate>) -> AppResult<Vec<Reservation>> {
        let today = date.unwrap_or_else(|| self.today());
        let query = ReservationQuery {
            status: Some(ReservationStatus::Approved),
            to: Some(today),
            ..Default::default()
        };
        let rows = self.store.list_reservations(&query).await?;
        Ok(due::return_due(rows, today))
    }

    // ---- Transitions ----

    /// Create a pending reservation. Overlap with other requests is allowed;
    /// it is arbitrated at approval.
    pub async fn create_reservation(
        &self,
        requester_id: i32,
        data: &CreateReservation,
    ) -> AppResult<Reservation> {
        let return_date =
            transitions::validate_window(data.start_date, data.end_date, data.return_date)?;
        let asset = self.store.get_asset(data.item_id).await?;
        transitions::ensure_reservable(&asset)?;

        let reservation = self
            .store
            .create_reservation(&NewReservation {
                item_id: data.item_id,
                requester_id,
                start_date: data.start_date,
                end_date: data.end_date,
                return_date,
                purpose: data.purpose.clone(),
            })
            .await?;

        tracing::info!(
            "Reservation {} created for asset {} ({} to {})",
            reservation.id,
            reservation.item_id,
            reservation.start_date,
            reservation.end_date
        );
        self.notifier.publish(ReservationEvent::created(&reservation));
        Ok(reservation)
    }

    pub async fn approve(&self, reservation_id: i32) -> AppResult<Reservation> {
        self.approve_at(reservation_id, Utc::now()).await
    }

    pub async fn approve_at(&self, reservation_id: i32, at: DateTime<Utc>) -> AppResult<Reservation> {
        let item_id = self.store.get_reservation(reservation_id).await?.item_id;
        let _guard = self.locks.acquire(item_id).await;

        let reservation = self.store.get_reservation(reservation_id).await?;
        let asset = self.store.get_asset(item_id).await?;
        let approved = self
            .store
            .approved_in_window(item_id, reservation.start_date, reservation.end_date)
            .await?;

        let transition = transitions::approve(&reservation, &asset, &approved, at)
            .map_err(|e| self.log_refusal(reservation_id, "approve", e))?;
        let (reservation, _) = self.commit(item_id, &transition).await?;

        self.notifier.publish(ReservationEvent::approved(&reservation));
        Ok(reservation)
    }

    pub async fn reject(&self, reservation_id: i32) -> AppResult<Reservation> {
        let (reservation, _) = self
            .apply(reservation_id, "reject", |r, _| transitions::reject(r, Utc::now()))
            .await?;
        self.notifier.publish(ReservationEvent::rejected(&reservation));
        Ok(reservation)
    }

    /// Cancel a pending reservation on behalf of its requester
    pub async fn cancel(&self, reservation_id: i32, requester_id: i32) -> AppResult<Reservation> {
        let (reservation, _) = self
            .apply(reservation_id, "cancel", |r, _| {
                transitions::cancel(r, requester_id, Utc::now())
            })
            .await?;
        Ok(reservation)
    }

    pub async fn confirm_receipt(
        &self,
        reservation_id: i32,
        report: &ConditionReport,
        actor_id: i32,
    ) -> AppResult<CustodyOutcome> {
        self.confirm_receipt_at(reservation_id, report, actor_id, Utc::now())
            .await
    }

    pub async fn confirm_receipt_at(
        &self,
        reservation_id: i32,
        report: &ConditionReport,
        actor_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<CustodyOutcome> {
        let (reservation, asset) = self
            .apply(reservation_id, "confirm receipt", |r, a| {
                transitions::confirm_receipt(r, a, report, actor_id, at)
            })
            .await?;
        Ok(CustodyOutcome { reservation, asset })
    }

    pub async fn confirm_return(
        &self,
        reservation_id: i32,
        report: &ConditionReport,
        actor_id: i32,
    ) -> AppResult<CustodyOutcome> {
        self.confirm_return_at(reservation_id, report, actor_id, Utc::now())
            .await
    }

    pub async fn confirm_return_at(
        &self,
        reservation_id: i32,
        report: &ConditionReport,
        actor_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<CustodyOutcome> {
        let (reservation, asset) = self
            .apply(reservation_id, "confirm return", |r, a| {
                transitions::confirm_return(r, a, report, actor_id, at)
            })
            .await?;
        Ok(CustodyOutcome { reservation, asset })
    }

    /// Maintenance → Available
    pub async fn complete_maintenance(&self, asset_id: i32) -> AppResult<Asset> {
        self.apply_to_asset(asset_id, transitions::complete_maintenance)
            .await
    }

    /// Take an asset out of service for good
    pub async fn retire_asset(&self, asset_id: i32) -> AppResult<Asset> {
        self.apply_to_asset(asset_id, transitions::retire).await
    }

    // ---- Internals ----

    /// Plan and commit a transition on one reservation while holding its asset's lock
    async fn apply<F>(
        &self,
        reservation_id: i32,
        action: &str,
        plan: F,
    ) -> AppResult<(Reservation, Asset)>
    where
        F: FnOnce(&Reservation, &Asset) -> AppResult<Transition>,
    {
        let item_id = self.store.get_reservation(reservation_id).await?.item_id;
        let _guard = self.locks.acquire(item_id).await;

        let reservation = self.store.get_reservation(reservation_id).await?;
        let asset = self.store.get_asset(item_id).await?;
        let transition = plan(&reservation, &asset)
            .map_err(|e| self.log_refusal(reservation_id, action, e))?;
        self.commit(item_id, &transition).await
    }

    async fn apply_to_asset<F>(&self, asset_id: i32, plan: F) -> AppResult<Asset>
    where
        F: FnOnce(&Asset) -> AppResult<Transition>,
    {
        let _guard = self.locks.acquire(asset_id).await;
        let asset = self.store.get_asset(asset_id).await?;
        let transition = plan(&asset)?;
        self.store.commit(&transition).await?;
        tracing::info!(
            "Asset {}: {} ({} -> {})",
            asset_id,
            transition.kind().as_str(),
            asset.status,
            transition
                .asset_change()
                .map(|c| c.to)
                .unwrap_or(asset.status)
        );
        self.store.get_asset(asset_id).await
    }

    /// Commit and read back the records it touched. Caller holds the item lock.
    async fn commit(&self, item_id: i32, transition: &Transition) -> AppResult<(Reservation, Asset)> {
        let reservation_id = transition
            .reservation()
            .map(|r| r.id)
            .ok_or_else(|| AppError::Internal("transition without reservation".to_string()))?;

        self.store.commit(transition).await.map_err(|e| {
            self.log_refusal(reservation_id, transition.kind().as_str(), e)
        })?;

        let reservation = self.store.get_reservation(reservation_id).await?;
        let asset = self.store.get_asset(item_id).await?;
        tracing::info!(
            "Reservation {}: {} committed (status {}, asset {} {})",
            reservation.id,
            transition.kind().as_str(),
            reservation.status,
            asset.id,
            asset.status
        );
        Ok((reservation, asset))
    }

    fn log_refusal(&self, reservation_id: i32, action: &str, error: AppError) -> AppError {
        match &error {
            AppError::Conflict(msg) | AppError::State(msg) | AppError::Validation(msg) => {
                tracing::warn!("Refused to {} reservation {}: {}", action, reservation_id, msg);
            }
            AppError::Authorization(msg) => {
                tracing::warn!("Unauthorized {} on reservation {}: {}", action, reservation_id, msg);
            }
            _ => {}
        }
        error
    }
}
