use axum::{
    extract::{Extension, Json, Path, Query},
    http::HeaderMap,
    response::Json as RespJson,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::booking::{BookingView, ConvertToBookingRequest};
use crate::model::reservation::{
    CreateReservationRequest, RecentActivity, Reservation, ReservationListResponse,
    ReservationQuery, ReservationStatus, UpdateReservationRequest,
};
use crate::routes::auth::resolve_user;
use crate::routes::AppState;

pub fn reservation_router() -> Router {
    Router::new()
        .route(
            "/api/customers/:id/reservations",
            get(list_customer_reservations).post(create_reservation),
        )
        .route("/api/customers/:id/activities", get(recent_activities))
        .route("/api/reservations", get(list_reservations))
        .route("/api/reservations/active", get(list_active_reservations))
        .route("/api/reservations/:id", put(update_reservation))
        .route("/api/reservations/:id/convert", post(convert_to_booking))
        .route("/api/customer/reservation/:id/cancel", put(cancel_reservation))
        .route("/api/admin/reservations/sweep", post(sweep_reservations))
}

/// The bearer identity must match the customer id in the path; staff
/// views go through `/api/reservations` instead.
async fn require_customer(
    headers: &HeaderMap,
    state: &AppState,
    customer_id: Uuid,
) -> AppResult<crate::model::user::User> {
    let user = resolve_user(headers, state).await?;
    if user.id != customer_id {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

async fn list_customer_reservations(
    headers: HeaderMap,
    Extension(state): Extension<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<RespJson<ReservationListResponse>> {
    require_customer(&headers, &state, customer_id).await?;
    let mut reservations = state.stores.reservations.list_by_user(customer_id).await?;
    reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = reservations.len();
    Ok(RespJson(ReservationListResponse { reservations, total }))
}

async fn create_reservation(
    headers: HeaderMap,
    Extension(state): Extension<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<CreateReservationRequest>,
) -> AppResult<RespJson<Reservation>> {
    let user = require_customer(&headers, &state, customer_id).await?;
    let reservation = state.lifecycle.create_reservation(&user, payload).await?;
    Ok(RespJson(reservation))
}

async fn recent_activities(
    headers: HeaderMap,
    Extension(state): Extension<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<RespJson<Vec<RecentActivity>>> {
    require_customer(&headers, &state, customer_id).await?;
    let activities = state.lifecycle.recent_activities(customer_id).await?;
    Ok(RespJson(activities))
}

async fn list_reservations(
    Extension(state): Extension<AppState>,
    Query(query): Query<ReservationQuery>,
) -> AppResult<RespJson<ReservationListResponse>> {
    let mut reservations = state.stores.reservations.list_all().await?;
    if let Some(status) = query.status {
        reservations.retain(|r| r.status == status);
    }
    reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = reservations.len();
    Ok(RespJson(ReservationListResponse { reservations, total }))
}

async fn list_active_reservations(
    Extension(state): Extension<AppState>,
) -> AppResult<RespJson<ReservationListResponse>> {
    let mut reservations = state.stores.reservations.list_all().await?;
    reservations.retain(|r| r.status == ReservationStatus::WaitingForApproval);
    reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = reservations.len();
    Ok(RespJson(ReservationListResponse { reservations, total }))
}

async fn update_reservation(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReservationRequest>,
) -> AppResult<RespJson<Reservation>> {
    let reservation = state.lifecycle.update_reservation(id, payload).await?;
    Ok(RespJson(reservation))
}

async fn cancel_reservation(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<Reservation>> {
    let reservation = state.lifecycle.cancel_reservation(id).await?;
    Ok(RespJson(reservation))
}

async fn convert_to_booking(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConvertToBookingRequest>,
) -> AppResult<RespJson<BookingView>> {
    let booking = state.lifecycle.convert_to_booking(id, payload).await?;
    Ok(RespJson(BookingView::at(booking, Utc::now())))
}

async fn sweep_reservations(
    Extension(state): Extension<AppState>,
) -> AppResult<RespJson<serde_json::Value>> {
    let expired = state.lifecycle.sweep_expired_reservations(Utc::now()).await?;
    Ok(RespJson(json!({ "expired": expired })))
}
