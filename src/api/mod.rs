//! API handlers for the custodian REST endpoints

pub mod assets;
pub mod health;
pub mod openapi;
pub mod reservations;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Assets
        .route("/assets", get(assets::list_assets).post(assets::create_asset))
        .route("/assets/:id", get(assets::get_asset).put(assets::update_asset))
        .route(
            "/assets/:id/maintenance/complete",
            post(assets::complete_maintenance),
        )
        .route("/assets/:id/retire", post(assets::retire_asset))
        // Reservations
        .route(
            "/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/reservations/due/pickup", get(reservations::pickup_due))
        .route("/reservations/due/return", get(reservations::return_due))
        .route("/reservations/:id", get(reservations::get_reservation))
        .route("/reservations/:id/approve", post(reservations::approve_reservation))
        .route("/reservations/:id/reject", post(reservations::reject_reservation))
        .route("/reservations/:id/cancel", post(reservations::cancel_reservation))
        .route("/reservations/:id/receipt", post(reservations::confirm_receipt))
        .route("/reservations/:id/return", post(reservations::confirm_return))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
