//! Reservation lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::{
        Capability, ConditionReport, CreateReservation, CustodyOutcome, Reservation,
        ReservationDetails, ReservationQuery,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Due list query
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DueQuery {
    /// Calendar day to evaluate (defaults to today in the reference timezone)
    pub date: Option<NaiveDate>,
}

/// List reservations
///
/// Requesters only ever see their own reservations, whatever the filters say.
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservations matching the filters", body = Vec<Reservation>)
    )
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<ReservationQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    if !claims.can_view_all_reservations() {
        query.requester_id = Some(claims.user_id);
    }

    let reservations = state.services.lifecycle.list_reservations(&query).await?;
    Ok(Json(reservations))
}

/// Get a reservation with its condition records
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation details", body = ReservationDetails),
        (status = 403, description = "Not your reservation"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReservationDetails>> {
    let details = state.services.lifecycle.get_reservation(id).await?;

    if !claims.can_view_all_reservations() && details.reservation.requester_id != claims.user_id {
        return Err(AppError::Authorization(format!(
            "Reservation {} belongs to another requester",
            id
        )));
    }

    Ok(Json(details))
}

/// Request an asset for a date window
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created (pending)", body = Reservation),
        (status = 400, description = "Invalid window or asset is not equipment"),
        (status = 404, description = "Asset not found"),
        (status = 409, description = "Asset is out of service")
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    claims.require(Capability::CreateReservation)?;

    let reservation = state
        .services
        .lifecycle
        .create_reservation(claims.user_id, &data)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Approve a pending reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/approve",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation approved", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Overlaps an approved reservation, or not pending")
    )
)]
pub async fn approve_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require(Capability::Approve)?;

    let reservation = state.services.lifecycle.approve(id).await?;
    Ok(Json(reservation))
}

/// Reject a pending reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/reject",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation rejected", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation is not pending")
    )
)]
pub async fn reject_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require(Capability::Reject)?;

    let reservation = state.services.lifecycle.reject(id).await?;
    Ok(Json(reservation))
}

/// Cancel one of your own pending reservations
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 403, description = "Not your reservation"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation is not pending")
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require(Capability::CancelOwn)?;

    let reservation = state.services.lifecycle.cancel(id, claims.user_id).await?;
    Ok(Json(reservation))
}

/// Confirm the asset was handed over
#[utoipa::path(
    post,
    path = "/reservations/{id}/receipt",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    request_body = ConditionReport,
    responses(
        (status = 200, description = "Receipt recorded", body = CustodyOutcome),
        (status = 400, description = "Damage reported without notes"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation not approved or already received")
    )
)]
pub async fn confirm_receipt(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(report): Json<ConditionReport>,
) -> AppResult<Json<CustodyOutcome>> {
    claims.require(Capability::ConfirmReceipt)?;

    let outcome = state
        .services
        .lifecycle
        .confirm_receipt(id, &report, claims.user_id)
        .await?;
    Ok(Json(outcome))
}

/// Confirm the asset came back
#[utoipa::path(
    post,
    path = "/reservations/{id}/return",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    request_body = ConditionReport,
    responses(
        (status = 200, description = "Return recorded", body = CustodyOutcome),
        (status = 400, description = "Damage reported without notes"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation not approved or already returned")
    )
)]
pub async fn confirm_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(report): Json<ConditionReport>,
) -> AppResult<Json<CustodyOutcome>> {
    claims.require(Capability::ConfirmReturn)?;

    let outcome = state
        .services
        .lifecycle
        .confirm_return(id, &report, claims.user_id)
        .await?;
    Ok(Json(outcome))
}

/// Approved reservations to hand out today
#[utoipa::path(
    get,
    path = "/reservations/due/pickup",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(DueQuery),
    responses(
        (status = 200, description = "Reservations due for pickup", body = Vec<Reservation>)
    )
)]
pub async fn pickup_due(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<DueQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    claims.require(Capability::ConfirmReceipt)?;

    let reservations = state.services.lifecycle.list_pickup_due(query.date).await?;
    Ok(Json(reservations))
}

/// Approved reservations whose return date has arrived
#[utoipa::path(
    get,
    path = "/reservations/due/return",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(DueQuery),
    responses(
        (status = 200, description = "Reservations due for return", body = Vec<Reservation>)
    )
)]
pub async fn return_due(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<DueQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    claims.require(Capability::ConfirmReturn)?;

    let reservations = state.services.lifecycle.list_return_due(query.date).await?;
    Ok(Json(reservations))
}
