//! Asset model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::AssetStatus;

/// Trackable item record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Asset {
    pub id: i32,
    /// Display name
    pub name: String,
    pub category: String,
    /// Only equipment can be reserved
    pub is_equipment: bool,
    pub location: Option<String>,
    pub serial_number: Option<String>,
    /// Derived custody status (read-only)
    pub status: AssetStatus,
    pub notes: Option<String>,
    pub crea_date: Option<DateTime<Utc>>,
    pub modif_date: Option<DateTime<Utc>>,
}

/// Register asset request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAsset {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "Category must not be empty"))]
    pub category: String,
    #[serde(default = "default_is_equipment")]
    pub is_equipment: bool,
    pub location: Option<String>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

fn default_is_equipment() -> bool {
    true
}

/// Update asset metadata request. Status is not part of it.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAsset {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Category must not be empty"))]
    pub category: Option<String>,
    pub is_equipment: Option<bool>,
    pub location: Option<String>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

/// Asset list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct AssetQuery {
    pub category: Option<String>,
    pub is_equipment: Option<bool>,
    pub status: Option<AssetStatus>,
}

impl AssetQuery {
    pub fn matches(&self, asset: &Asset) -> bool {
        self.category.as_ref().map_or(true, |c| &asset.category == c)
            && self.is_equipment.map_or(true, |e| asset.is_equipment == e)
            && self.status.map_or(true, |s| asset.status == s)
    }
}
