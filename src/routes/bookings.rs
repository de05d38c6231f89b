use axum::{
    extract::{Extension, Json, Path},
    response::Json as RespJson,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::booking::{BookingView, CreateBookingRequest, RecordPaymentRequest};
use crate::routes::AppState;

pub fn booking_router() -> Router {
    Router::new()
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/:id", get(get_booking))
        .route("/api/bookings/:id/activate", put(activate_booking))
        .route("/api/bookings/:id/complete", put(complete_booking))
        .route("/api/bookings/:id/cancel", put(cancel_booking))
        .route("/api/bookings/:id/payment", put(record_payment))
}

// Every read evaluates the derived fields at request time; Overdue is
// never stored, so two reads straddling midnight may disagree.
async fn list_bookings(
    Extension(state): Extension<AppState>,
) -> AppResult<RespJson<Vec<BookingView>>> {
    let now = Utc::now();
    let bookings = state.stores.bookings.list_all().await?;
    let views = bookings.into_iter().map(|b| BookingView::at(b, now)).collect();
    Ok(RespJson(views))
}

async fn get_booking(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<BookingView>> {
    let booking = state
        .stores
        .bookings
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Booking"))?;
    Ok(RespJson(BookingView::at(booking, Utc::now())))
}

async fn create_booking(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<RespJson<BookingView>> {
    let booking = state.lifecycle.create_booking(payload).await?;
    Ok(RespJson(BookingView::at(booking, Utc::now())))
}

async fn activate_booking(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<BookingView>> {
    let booking = state.lifecycle.activate_booking(id).await?;
    Ok(RespJson(BookingView::at(booking, Utc::now())))
}

async fn complete_booking(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<BookingView>> {
    let booking = state.lifecycle.complete_booking(id).await?;
    Ok(RespJson(BookingView::at(booking, Utc::now())))
}

async fn cancel_booking(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<BookingView>> {
    let booking = state.lifecycle.cancel_booking(id).await?;
    Ok(RespJson(BookingView::at(booking, Utc::now())))
}

async fn record_payment(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> AppResult<RespJson<BookingView>> {
    let booking = state
        .lifecycle
        .record_payment(id, payload.payment_method)
        .await?;
    Ok(RespJson(BookingView::at(booking, Utc::now())))
}
