//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{assets, health, reservations};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Custodian API",
        version = "0.3.0",
        description = "Equipment reservation and custody REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Assets
        assets::list_assets,
        assets::get_asset,
        assets::create_asset,
        assets::update_asset,
        assets::complete_maintenance,
        assets::retire_asset,
        // Reservations
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::create_reservation,
        reservations::approve_reservation,
        reservations::reject_reservation,
        reservations::cancel_reservation,
        reservations::confirm_receipt,
        reservations::confirm_return,
        reservations::pickup_due,
        reservations::return_due,
    ),
    components(
        schemas(
            // Assets
            crate::models::Asset,
            crate::models::AssetQuery,
            crate::models::CreateAsset,
            crate::models::UpdateAsset,
            crate::models::AssetStatus,
            // Reservations
            crate::models::Reservation,
            crate::models::ReservationStatus,
            crate::models::ReservationQuery,
            crate::models::ReservationDetails,
            crate::models::CreateReservation,
            crate::models::ConditionReport,
            crate::models::ConditionRecord,
            crate::models::CustodyOutcome,
            crate::models::Condition,
            crate::models::CustodyEvent,
            reservations::DueQuery,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "assets", description = "Asset registry"),
        (name = "reservations", description = "Reservation lifecycle and custody")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
