//! Asset domain methods on Repository

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{Asset, AssetQuery, AssetStatus, CreateAsset, UpdateAsset},
};

impl Repository {
    /// List assets matching the query
    pub async fn assets_list(&self, query: &AssetQuery) -> AppResult<Vec<Asset>> {
        let rows = sqlx::query_as::<_, Asset>(
            r#"
            SELECT * FROM assets
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::boolean IS NULL OR is_equipment = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY name
            "#,
        )
        .bind(&query.category)
        .bind(query.is_equipment)
        .bind(query.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Get asset by ID
    pub async fn assets_get_by_id(&self, id: i32) -> AppResult<Asset> {
        sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::asset_not_found(id))
    }

    /// Register an asset
    pub async fn assets_create(&self, data: &CreateAsset) -> AppResult<Asset> {
        let row = sqlx::query_as::<_, Asset>(
            r#"
            INSERT INTO assets (name, category, is_equipment, location, serial_number, notes, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.category)
        .bind(data.is_equipment)
        .bind(&data.location)
        .bind(&data.serial_number)
        .bind(&data.notes)
        .bind(AssetStatus::Available)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update asset metadata. The status column is never part of this update.
    pub async fn assets_update(&self, id: i32, data: &UpdateAsset) -> AppResult<Asset> {
        let mut sets = vec!["modif_date = NOW()".to_string()];
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.category, "category");
        add_field!(data.is_equipment, "is_equipment");
        add_field!(data.location, "location");
        add_field!(data.serial_number, "serial_number");
        add_field!(data.notes, "notes");

        let query = format!(
            "UPDATE assets SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            idx
        );

        let mut builder = sqlx::query_as::<_, Asset>(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.category);
        bind_field!(data.is_equipment);
        bind_field!(data.location);
        bind_field!(data.serial_number);
        bind_field!(data.notes);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::asset_not_found(id))
    }
}
