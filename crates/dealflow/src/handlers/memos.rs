//! Memo editing and memo comment handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use dealflow_auth::CurrentUser;
use dealflow_core::deal::{
    validate_comment, CreateCommentRequest, MemoComment, MiniMemo, UpdateMemoRequest,
};
use dealflow_core::notification::builders;
use dealflow_core::storage::RepositoryError;

use super::authz::{require_owner_or_admin, require_writer};
use super::deals::load_deal;
use crate::{handlers::AppError, state::AppState};

async fn load_memo(state: &AppState, id: Uuid) -> Result<MiniMemo, AppError> {
    Ok(state
        .memos
        .get_memo(id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "Memo",
            id: id.to_string(),
        })?)
}

/// PUT /api/memos/{id} (author or admin)
pub async fn update_memo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMemoRequest>,
) -> Result<Json<MiniMemo>, AppError> {
    let mut memo = load_memo(&state, id).await?;
    require_owner_or_admin(&user, memo.user_id, "memo")?;

    request.apply_to(&mut memo)?;
    memo.updated_at = Utc::now();
    state.memos.update_memo(&memo).await?;

    tracing::info!(memo_id = %id, score = memo.score, "Memo updated");
    Ok(Json(memo))
}

/// DELETE /api/memos/{id} (author or admin)
pub async fn delete_memo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let memo = load_memo(&state, id).await?;
    require_owner_or_admin(&user, memo.user_id, "memo")?;

    state.memos.delete_memo(id).await?;
    tracing::info!(memo_id = %id, deleted_by = %user.id, "Memo deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/memos/{id}/comments
pub async fn list_comments(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MemoComment>>, AppError> {
    load_memo(&state, id).await?;
    Ok(Json(state.memos.list_comments(id).await?))
}

/// POST /api/memos/{id}/comments
///
/// The memo author is notified unless they wrote the comment.
pub async fn add_comment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<MemoComment>), AppError> {
    require_writer(&user)?;
    validate_comment(&request.content)?;
    let memo = load_memo(&state, id).await?;

    let comment = MemoComment::new(id, user.id, request.content.trim());
    state.memos.add_comment(&comment).await?;

    if memo.user_id != user.id {
        let deal = load_deal(&state, memo.deal_id).await?;
        let notification =
            builders::memo_comment(memo.user_id, &deal, &user.full_name, &comment.content);
        if let Err(err) = state.notifications.create_notification(&notification).await {
            tracing::warn!(user_id = %memo.user_id, error = %err, "Failed to notify memo author");
        }
    }

    tracing::debug!(comment_id = %comment.id, memo_id = %id, "Comment added");
    Ok((StatusCode::CREATED, Json(comment)))
}
