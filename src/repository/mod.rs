//! Persistence layer: the store interface and its PostgreSQL and in-memory
//! implementations

pub mod assets;
pub mod memory;
pub mod postgres;
pub mod reservations;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    lifecycle::Transition,
    models::{
        Asset, AssetQuery, ConditionRecord, CreateAsset, NewReservation, Reservation,
        ReservationQuery, UpdateAsset,
    },
};

pub use memory::MemoryStore;

/// Storage for assets, reservations and the condition audit trail.
///
/// There is deliberately no way to write an asset status or a condition
/// record outside [`CustodyStore::commit`], which only accepts a
/// [`Transition`] built by the lifecycle rules.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustodyStore: Send + Sync {
    /// Register an asset; it starts out available
    async fn create_asset(&self, data: &CreateAsset) -> AppResult<Asset>;

    /// Update asset metadata
    async fn update_asset(&self, id: i32, data: &UpdateAsset) -> AppResult<Asset>;

    async fn get_asset(&self, id: i32) -> AppResult<Asset>;

    async fn list_assets(&self, query: &AssetQuery) -> AppResult<Vec<Asset>>;

    /// Insert a pending reservation
    async fn create_reservation(&self, data: &NewReservation) -> AppResult<Reservation>;

    async fn get_reservation(&self, id: i32) -> AppResult<Reservation>;

    async fn list_reservations(&self, query: &ReservationQuery) -> AppResult<Vec<Reservation>>;

    /// Approved reservations of `item_id` whose window may touch `[start, end]`.
    /// Served from a per-item index; may return a superset.
    async fn approved_in_window(
        &self,
        item_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<Reservation>>;

    async fn list_condition_records(&self, reservation_id: i32) -> AppResult<Vec<ConditionRecord>>;

    /// Apply every write of `transition` atomically.
    ///
    /// Fails with `AppError::State` when the reservation version or the asset
    /// status no longer match what the transition was planned against, and
    /// with `AppError::Conflict` when an approval would double-book the asset.
    async fn commit(&self, transition: &Transition) -> AppResult<()>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}
