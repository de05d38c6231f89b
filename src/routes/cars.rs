use axum::{
    extract::{Extension, Json, Path, Query},
    response::Json as RespJson,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::model::car::{
    Car, CarListResponse, CarQuery, CreateCarRequest, UpdateCarImagesRequest, UpdateCarRequest,
};
use crate::routes::AppState;

pub fn car_router() -> Router {
    Router::new()
        .route("/api/cars", get(list_cars))
        .route("/api/cars/:id", get(get_car))
        .route("/api/cars/:id/reserved", get(is_car_reserved))
        .route("/api/admin/cars", post(create_car))
        .route("/api/admin/cars/:id/edit", put(update_car))
        .route("/api/admin/cars/:id/images", put(update_car_images))
        .route("/api/admin/cars/:id", delete(delete_car))
}

async fn list_cars(
    Extension(state): Extension<AppState>,
    Query(query): Query<CarQuery>,
) -> AppResult<RespJson<CarListResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let (cars, total) = state.stores.cars.list(&query).await?;
    Ok(RespJson(CarListResponse {
        cars,
        total,
        page,
        limit,
    }))
}

async fn get_car(
    Extension(state): Extension<AppState>,
    Path(car_id): Path<i32>,
) -> AppResult<RespJson<Car>> {
    let car = state
        .stores
        .cars
        .find_by_id(car_id)
        .await?
        .ok_or(AppError::NotFound("Car"))?;
    Ok(RespJson(car))
}

async fn is_car_reserved(
    Extension(state): Extension<AppState>,
    Path(car_id): Path<i32>,
) -> AppResult<RespJson<serde_json::Value>> {
    let reserved = state.lifecycle.is_car_reserved(car_id).await?;
    Ok(RespJson(json!({ "reserved": reserved })))
}

async fn create_car(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateCarRequest>,
) -> AppResult<RespJson<Car>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Missing car name".into()));
    }
    if payload.price_per_day <= 0 {
        return Err(AppError::Validation("Price per day must be positive".into()));
    }
    let car = state.stores.cars.create(payload).await?;
    tracing::info!(car_id = car.id, "car added to the fleet");
    Ok(RespJson(car))
}

// The update payload has no availability field; holds are managed by
// the lifecycle manager alone.
async fn update_car(
    Extension(state): Extension<AppState>,
    Path(car_id): Path<i32>,
    Json(payload): Json<UpdateCarRequest>,
) -> AppResult<RespJson<Car>> {
    let mut car = state
        .stores
        .cars
        .find_by_id(car_id)
        .await?
        .ok_or(AppError::NotFound("Car"))?;
    car.apply_update(payload);
    let car = state.stores.cars.update(car).await?;
    Ok(RespJson(car))
}

async fn update_car_images(
    Extension(state): Extension<AppState>,
    Path(car_id): Path<i32>,
    Json(payload): Json<UpdateCarImagesRequest>,
) -> AppResult<RespJson<Car>> {
    let mut car = state
        .stores
        .cars
        .find_by_id(car_id)
        .await?
        .ok_or(AppError::NotFound("Car"))?;
    if payload.image_url.is_some() {
        car.image_url = payload.image_url;
    }
    car.images = payload.images;
    let car = state.stores.cars.update(car).await?;
    Ok(RespJson(car))
}

async fn delete_car(
    Extension(state): Extension<AppState>,
    Path(car_id): Path<i32>,
) -> AppResult<RespJson<serde_json::Value>> {
    state.stores.cars.delete(car_id).await?;
    Ok(RespJson(json!({ "message": "Car deleted successfully" })))
}
