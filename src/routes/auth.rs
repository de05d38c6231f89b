use axum::{
    extract::{Extension, Json},
    http::{HeaderMap, StatusCode},
    response::Json as RespJson,
    routing::post,
    Router,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::user::{LoginRequest, RegisterRequest, TokenResponse, User};
use crate::routes::AppState;

pub fn auth_router() -> Router {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
}

/// Resolves the requester from the bearer token. The token is the demo
/// `dummy_token_for_{user_id}` format; the user must still exist.
pub async fn resolve_user(headers: &HeaderMap, state: &AppState) -> AppResult<User> {
    let token = headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let user_id = token
        .strip_prefix("dummy_token_for_")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or(AppError::Unauthorized)?;

    state
        .stores
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)
}

async fn register(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<StatusCode> {
    if payload.username.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::Validation("Missing username or password".into()));
    }
    let user = User {
        id: Uuid::new_v4(),
        full_name: payload.full_name,
        username: payload.username,
        email: payload.email,
        phone: payload.phone,
        // Plain text, demo parity with the login check below.
        password_hash: payload.password,
        created_at: Utc::now(),
    };
    state.stores.users.create(user).await?;
    Ok(StatusCode::CREATED)
}

async fn login(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<RespJson<TokenResponse>> {
    let user = state
        .stores
        .users
        .find_by_credentials(&payload.username, &payload.password)
        .await?
        .ok_or(AppError::Unauthorized)?;

    tracing::info!(user_id = %user.id, "login successful");
    Ok(RespJson(TokenResponse {
        token: format!("dummy_token_for_{}", user.id),
    }))
}
