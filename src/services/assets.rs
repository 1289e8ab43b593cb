//! Asset registry service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppResult,
    models::{Asset, AssetQuery, CreateAsset, UpdateAsset},
    repository::CustodyStore,
};

/// Registry operations. Status is read-only here; see `LifecycleService`.
#[derive(Clone)]
pub struct AssetsService {
    store: Arc<dyn CustodyStore>,
}

impl AssetsService {
    pub fn new(store: Arc<dyn CustodyStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &AssetQuery) -> AppResult<Vec<Asset>> {
        self.store.list_assets(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Asset> {
        self.store.get_asset(id).await
    }

    pub async fn create(&self, data: &CreateAsset) -> AppResult<Asset> {
        data.validate()?;
        let asset = self.store.create_asset(data).await?;
        tracing::info!("Registered asset {} ({})", asset.id, asset.name);
        Ok(asset)
    }

    pub async fn update(&self, id: i32, data: &UpdateAsset) -> AppResult<Asset> {
        data.validate()?;
        self.store.update_asset(id, data).await
    }
}
