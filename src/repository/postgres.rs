//! `CustodyStore` implementation for the PostgreSQL repository

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{CustodyStore, Repository};
use crate::{
    error::AppResult,
    lifecycle::Transition,
    models::{
        Asset, AssetQuery, ConditionRecord, CreateAsset, NewReservation, Reservation,
        ReservationQuery, UpdateAsset,
    },
};

#[async_trait]
impl CustodyStore for Repository {
    async fn create_asset(&self, data: &CreateAsset) -> AppResult<Asset> {
        self.assets_create(data).await
    }

    async fn update_asset(&self, id: i32, data: &UpdateAsset) -> AppResult<Asset> {
        self.assets_update(id, data).await
    }

    async fn get_asset(&self, id: i32) -> AppResult<Asset> {
        self.assets_get_by_id(id).await
    }

    async fn list_assets(&self, query: &AssetQuery) -> AppResult<Vec<Asset>> {
        self.assets_list(query).await
    }

    async fn create_reservation(&self, data: &NewReservation) -> AppResult<Reservation> {
        self.reservations_create(data).await
    }

    async fn get_reservation(&self, id: i32) -> AppResult<Reservation> {
        self.reservations_get_by_id(id).await
    }

    async fn list_reservations(&self, query: &ReservationQuery) -> AppResult<Vec<Reservation>> {
        self.reservations_list(query).await
    }

    async fn approved_in_window(
        &self,
        item_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Reservation>> {
        self.reservations_approved_in_window(item_id, start, end).await
    }

    async fn list_condition_records(&self, reservation_id: i32) -> AppResult<Vec<ConditionRecord>> {
        self.condition_records_list(reservation_id).await
    }

    async fn commit(&self, transition: &Transition) -> AppResult<()> {
        self.reservations_commit(transition).await
    }
}
