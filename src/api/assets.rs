//! Asset registry endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{Asset, AssetQuery, Capability, CreateAsset, UpdateAsset},
    AppState,
};

use super::AuthenticatedUser;

/// List assets
#[utoipa::path(
    get,
    path = "/assets",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(AssetQuery),
    responses(
        (status = 200, description = "Assets matching the filters", body = Vec<Asset>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_assets(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<AssetQuery>,
) -> AppResult<Json<Vec<Asset>>> {
    let assets = state.services.assets.list(&query).await?;
    Ok(Json(assets))
}

/// Get asset by ID
#[utoipa::path(
    get,
    path = "/assets/{id}",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Asset ID")
    ),
    responses(
        (status = 200, description = "Asset details", body = Asset),
        (status = 404, description = "Asset not found")
    )
)]
pub async fn get_asset(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Asset>> {
    let asset = state.services.assets.get_by_id(id).await?;
    Ok(Json(asset))
}

/// Register a new asset
#[utoipa::path(
    post,
    path = "/assets",
    tag = "assets",
    security(("bearer_auth" = [])),
    request_body = CreateAsset,
    responses(
        (status = 201, description = "Asset registered", body = Asset),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Insufficient rights")
    )
)]
pub async fn create_asset(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateAsset>,
) -> AppResult<(StatusCode, Json<Asset>)> {
    claims.require(Capability::ManageAssets)?;

    let asset = state.services.assets.create(&data).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// Update asset metadata
#[utoipa::path(
    put,
    path = "/assets/{id}",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Asset ID")
    ),
    request_body = UpdateAsset,
    responses(
        (status = 200, description = "Asset updated", body = Asset),
        (status = 404, description = "Asset not found")
    )
)]
pub async fn update_asset(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateAsset>,
) -> AppResult<Json<Asset>> {
    claims.require(Capability::ManageAssets)?;

    let asset = state.services.assets.update(id, &data).await?;
    Ok(Json(asset))
}

/// Put an asset back in service after maintenance
#[utoipa::path(
    post,
    path = "/assets/{id}/maintenance/complete",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Asset ID")
    ),
    responses(
        (status = 200, description = "Asset available again", body = Asset),
        (status = 404, description = "Asset not found"),
        (status = 409, description = "Asset is not under maintenance")
    )
)]
pub async fn complete_maintenance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Asset>> {
    claims.require(Capability::ManageAssets)?;

    let asset = state.services.lifecycle.complete_maintenance(id).await?;
    Ok(Json(asset))
}

/// Take an asset out of service
#[utoipa::path(
    post,
    path = "/assets/{id}/retire",
    tag = "assets",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Asset ID")
    ),
    responses(
        (status = 200, description = "Asset retired", body = Asset),
        (status = 404, description = "Asset not found"),
        (status = 409, description = "Asset is in use or already retired")
    )
)]
pub async fn retire_asset(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Asset>> {
    claims.require(Capability::ManageAssets)?;

    let asset = state.services.lifecycle.retire_asset(id).await?;
    Ok(Json(asset))
}
