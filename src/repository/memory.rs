//! In-memory store, used for development runs and tests

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::CustodyStore;
use crate::{
    error::{AppError, AppResult},
    lifecycle::{windows_overlap, Transition},
    models::{
        Asset, AssetQuery, AssetStatus, ConditionRecord, CreateAsset, NewReservation,
        Reservation, ReservationQuery, ReservationStatus, UpdateAsset,
    },
};

/// Approved windows of one item: `(start_date, reservation id) -> end_date`
type WindowIndex = BTreeMap<(NaiveDate, i32), NaiveDate>;

#[derive(Default)]
struct State {
    next_asset_id: i32,
    next_reservation_id: i32,
    next_record_id: i32,
    assets: BTreeMap<i32, Asset>,
    reservations: BTreeMap<i32, Reservation>,
    approved: HashMap<i32, WindowIndex>,
    records: Vec<ConditionRecord>,
}

impl State {
    fn asset(&self, id: i32) -> AppResult<&Asset> {
        self.assets
            .get(&id)
            .ok_or_else(|| AppError::asset_not_found(id))
    }

    fn reservation(&self, id: i32) -> AppResult<&Reservation> {
        self.reservations
            .get(&id)
            .ok_or_else(|| AppError::reservation_not_found(id))
    }

    /// Ids of approved reservations of `item_id` overlapping `[start, end]`
    fn approved_ids(&self, item_id: i32, start: NaiveDate, end: NaiveDate) -> Vec<i32> {
        let Some(index) = self.approved.get(&item_id) else {
            return Vec::new();
        };
        // Windows starting after `end` cannot overlap
        index
            .range(..=(end, i32::MAX))
            .filter(|(key, other_end)| windows_overlap(start, end, key.0, **other_end))
            .map(|(key, _)| key.1)
            .collect()
    }

    fn reindex(&mut self, previous: &Reservation, next: &Reservation) {
        if previous.status == ReservationStatus::Approved {
            if let Some(index) = self.approved.get_mut(&previous.item_id) {
                index.remove(&(previous.start_date, previous.id));
            }
        }
        if next.status == ReservationStatus::Approved {
            self.approved
                .entry(next.item_id)
                .or_default()
                .insert((next.start_date, next.id), next.end_date);
        }
    }
}

/// Store keeping everything in process memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CustodyStore for MemoryStore {
    async fn create_asset(&self, data: &CreateAsset) -> AppResult<Asset> {
        let mut state = self.write()?;
        state.next_asset_id += 1;
        let now = Utc::now();
        let asset = Asset {
            id: state.next_asset_id,
            name: data.name.clone(),
            category: data.category.clone(),
            is_equipment: data.is_equipment,
            location: data.location.clone(),
            serial_number: data.serial_number.clone(),
            status: AssetStatus::Available,
            notes: data.notes.clone(),
            crea_date: Some(now),
            modif_date: Some(now),
        };
        state.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn update_asset(&self, id: i32, data: &UpdateAsset) -> AppResult<Asset> {
        let mut state = self.write()?;
        let asset = state
            .assets
            .get_mut(&id)
            .ok_or_else(|| AppError::asset_not_found(id))?;
        if let Some(ref name) = data.name {
            asset.name = name.clone();
        }
        if let Some(ref category) = data.category {
            asset.category = category.clone();
        }
        if let Some(is_equipment) = data.is_equipment {
            asset.is_equipment = is_equipment;
        }
        if data.location.is_some() {
            asset.location = data.location.clone();
        }
        if data.serial_number.is_some() {
            asset.serial_number = data.serial_number.clone();
        }
        if data.notes.is_some() {
            asset.notes = data.notes.clone();
        }
        asset.modif_date = Some(Utc::now());
        Ok(asset.clone())
    }

    async fn get_asset(&self, id: i32) -> AppResult<Asset> {
        self.read()?.asset(id).cloned()
    }

    async fn list_assets(&self, query: &AssetQuery) -> AppResult<Vec<Asset>> {
        let state = self.read()?;
        let mut assets: Vec<Asset> = state
            .assets
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assets)
    }

    async fn create_reservation(&self, data: &NewReservation) -> AppResult<Reservation> {
        let mut state = self.write()?;
        state.asset(data.item_id)?;
        state.next_reservation_id += 1;
        let now = Utc::now();
        let reservation = Reservation {
            id: state.next_reservation_id,
            item_id: data.item_id,
            requester_id: data.requester_id,
            start_date: data.start_date,
            end_date: data.end_date,
            return_date: data.return_date,
            status: ReservationStatus::Pending,
            purpose: data.purpose.clone(),
            checkout_date: None,
            item_condition_on_receive: None,
            damage_notes: None,
            returned_at: None,
            item_condition_on_return: None,
            return_notes: None,
            version: 1,
            crea_date: Some(now),
            modif_date: Some(now),
        };
        state.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn get_reservation(&self, id: i32) -> AppResult<Reservation> {
        self.read()?.reservation(id).cloned()
    }

    async fn list_reservations(&self, query: &ReservationQuery) -> AppResult<Vec<Reservation>> {
        let state = self.read()?;
        let mut rows: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.start_date, r.id));
        Ok(rows)
    }

    async fn approved_in_window(
        &self,
        item_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Reservation>> {
        let state = self.read()?;
        state
            .approved_ids(item_id, start, end)
            .into_iter()
            .map(|id| state.reservation(id).cloned())
            .collect()
    }

    async fn list_condition_records(&self, reservation_id: i32) -> AppResult<Vec<ConditionRecord>> {
        let state = self.read()?;
        Ok(state
            .records
            .iter()
            .filter(|r| r.reservation_id == reservation_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, transition: &Transition) -> AppResult<()> {
        let mut state = self.write()?;

        // Check every guard before touching anything
        let previous = match transition.reservation() {
            Some(next) => {
                let current = state.reservation(next.id)?;
                if current.version != transition.expected_version() {
                    return Err(AppError::State(format!(
                        "Reservation {} was modified concurrently",
                        next.id
                    )));
                }
                if next.status == ReservationStatus::Approved
                    && current.status != ReservationStatus::Approved
                {
                    let clashes: Vec<i32> = state
                        .approved_ids(next.item_id, next.start_date, next.end_date)
                        .into_iter()
                        .filter(|&id| id != next.id)
                        .collect();
                    if !clashes.is_empty() {
                        return Err(AppError::Conflict(format!(
                            "Asset {} is already reserved for an overlapping window",
                            next.item_id
                        )));
                    }
                }
                Some(current.clone())
            }
            None => None,
        };
        if let Some(change) = transition.asset_change() {
            if state.asset(change.asset_id)?.status != change.from {
                return Err(AppError::State(format!(
                    "Asset {} changed status concurrently",
                    change.asset_id
                )));
            }
        }

        if let (Some(previous), Some(next)) = (previous, transition.reservation()) {
            state.reindex(&previous, next);
            state.reservations.insert(next.id, next.clone());
        }
        if let Some(change) = transition.asset_change() {
            if let Some(asset) = state.assets.get_mut(&change.asset_id) {
                asset.status = change.to;
                asset.modif_date = Some(Utc::now());
            }
        }
        if let Some(record) = transition.condition_record() {
            state.next_record_id += 1;
            let record = ConditionRecord {
                id: state.next_record_id,
                reservation_id: record.reservation_id,
                event_type: record.event_type,
                condition: record.condition,
                notes: record.notes.clone(),
                recorded_by: record.recorded_by,
                recorded_at: record.recorded_at,
            };
            state.records.push(record);
        }
        Ok(())
    }
}
