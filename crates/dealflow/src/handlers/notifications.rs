//! Notification handlers. Every route only sees the caller's own notifications.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use dealflow_auth::CurrentUser;
use dealflow_core::notification::{Notification, NotificationQuery, UnreadCount};
use dealflow_core::storage::RepositoryError;

use crate::{handlers::AppError, state::AppState};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

fn notification_not_found(id: Uuid) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: "Notification",
        id: id.to_string(),
    }
}

/// GET /api/notifications?unread_only=&limit=
pub async fn list_notifications(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let notifications = state
        .notifications
        .list_notifications(user.id, query.unread_only, limit)
        .await?;
    Ok(Json(notifications))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UnreadCount>, AppError> {
    let unread = state.notifications.unread_count(user.id).await?;
    Ok(Json(UnreadCount { unread }))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let updated = state.notifications.mark_all_read(user.id).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// PATCH /api/notifications/{id}/read
pub async fn mark_read(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.notifications.mark_read(id, user.id).await? {
        return Err(notification_not_found(id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.notifications.delete_notification(id, user.id).await? {
        return Err(notification_not_found(id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
