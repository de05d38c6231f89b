use axum::{
    extract::{Extension, Path, Query},
    response::Json as RespJson,
    routing::{get, put},
    Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppResult;
use crate::model::notification::{Notification, NotificationQuery, UnreadCountResponse};
use crate::routes::AppState;

pub fn notification_router() -> Router {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/:id/read", put(mark_read))
}

// Without a user_id the staff broadcast feed is returned.
async fn list_notifications(
    Extension(state): Extension<AppState>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<RespJson<Vec<Notification>>> {
    let notifications = state.stores.notifications.list_for(query.user_id).await?;
    Ok(RespJson(notifications))
}

async fn unread_count(
    Extension(state): Extension<AppState>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<RespJson<UnreadCountResponse>> {
    let unread = state
        .stores
        .notifications
        .unread_count_for(query.user_id)
        .await?;
    Ok(RespJson(UnreadCountResponse { unread }))
}

async fn mark_read(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<RespJson<serde_json::Value>> {
    state.stores.notifications.mark_read(id).await?;
    Ok(RespJson(json!({ "success": true })))
}
