//! Deal pipeline handlers: CRUD, stage changes, timeline, stars, memos and
//! assignments.

use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use dealflow_auth::CurrentUser;
use dealflow_core::deal::{
    change_stage, creation_event, filter_deals, sort_deals_by_recent, summarize_deal,
    validate_deal, validate_note, AssignUserRequest, ChangeStageRequest, CreateDealRequest,
    CreateMemoRequest, CreateNoteRequest, Deal, DealAssignment, DealError, DealFilter, DealStar,
    DealSummary, MiniMemo, TimelineEvent, TimelineEventType, UpdateDealRequest,
};
use dealflow_core::document::Document;
use dealflow_core::fund::FundAllocation;
use dealflow_core::notification::builders;
use dealflow_core::storage::RepositoryError;
use dealflow_core::user::User;

use super::authz::{require_deal_deleter, require_writer};
use crate::{handlers::AppError, state::AppState};

fn deal_not_found(id: Uuid) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: "Deal",
        id: id.to_string(),
    }
}

/// Fetch a deal or fail with 404.
pub(crate) async fn load_deal(state: &AppState, id: Uuid) -> Result<Deal, AppError> {
    Ok(state
        .deals
        .get_deal(id)
        .await?
        .ok_or_else(|| deal_not_found(id))?)
}

async fn summarize(state: &AppState, deal: Deal, viewer: Uuid) -> Result<DealSummary, AppError> {
    let stars = state.stars.list_stars_for_deal(deal.id).await?;
    let memos = state.memos.list_memos_for_deal(deal.id).await?;
    let assignments = state.assignments.list_assignments_for_deal(deal.id).await?;
    Ok(summarize_deal(deal, &stars, &memos, &assignments, viewer))
}

/// Timeline writes are best-effort once the primary write has succeeded.
pub(crate) async fn record_event(state: &AppState, event: &TimelineEvent) {
    if let Err(err) = state.timeline.add_timeline_event(event).await {
        tracing::warn!(
            deal_id = %event.deal_id,
            event_type = event.event_type.as_str(),
            error = %err,
            "Failed to record timeline event"
        );
    }
}

// ============================================================================
// Deals
// ============================================================================

/// GET /api/deals
pub async fn list_deals(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(filter): Query<DealFilter>,
) -> Result<Json<Vec<DealSummary>>, AppError> {
    let mut deals = state.deals.list_deals().await?;
    sort_deals_by_recent(&mut deals);

    let starred: HashSet<Uuid> = if filter.starred {
        state
            .stars
            .list_stars_by_user(user.id)
            .await?
            .into_iter()
            .map(|s| s.deal_id)
            .collect()
    } else {
        HashSet::new()
    };
    let assigned: HashSet<Uuid> = if filter.assigned {
        state
            .assignments
            .list_assignments_for_user(user.id)
            .await?
            .into_iter()
            .map(|a| a.deal_id)
            .collect()
    } else {
        HashSet::new()
    };

    let stars = state.stars.list_all_stars().await?;
    let memos = state.memos.list_all_memos().await?;
    let assignments = state.assignments.list_all_assignments().await?;

    let summaries = filter_deals(&deals, &filter, &starred, &assigned)
        .into_iter()
        .map(|deal| summarize_deal(deal.clone(), &stars, &memos, &assignments, user.id))
        .collect();
    Ok(Json(summaries))
}

/// POST /api/deals
pub async fn create_deal(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateDealRequest>,
) -> Result<(StatusCode, Json<Deal>), AppError> {
    require_writer(&user)?;
    let deal = request.into_deal(user.id);
    validate_deal(&deal)?;

    state.deals.create_deal(&deal).await?;
    record_event(&state, &creation_event(&deal, user.id)).await;

    tracing::info!(deal_id = %deal.id, name = %deal.name, stage = %deal.stage, "Deal created");
    Ok((StatusCode::CREATED, Json(deal)))
}

/// GET /api/deals/{id}
pub async fn get_deal(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DealSummary>, AppError> {
    let deal = load_deal(&state, id).await?;
    Ok(Json(summarize(&state, deal, user.id).await?))
}

/// PUT /api/deals/{id}
pub async fn update_deal(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDealRequest>,
) -> Result<Json<Deal>, AppError> {
    require_writer(&user)?;
    let mut deal = load_deal(&state, id).await?;
    request.apply_to(&mut deal);
    validate_deal(&deal)?;
    deal.updated_at = Utc::now();

    state.deals.update_deal(&deal).await?;
    tracing::info!(deal_id = %id, updated_by = %user.id, "Deal updated");
    Ok(Json(deal))
}

/// DELETE /api/deals/{id}
///
/// Timeline, stars, memos, comments, assignments and documents go with the
/// deal. Deals with fund allocations cannot be deleted.
pub async fn delete_deal(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_deal_deleter(&user)?;
    load_deal(&state, id).await?;
    if !state.funds.list_allocations_by_deal(id).await?.is_empty() {
        return Err(DealError::HasAllocations.into());
    }

    state.deals.delete_deal(id).await?;
    tracing::info!(deal_id = %id, deleted_by = %user.id, "Deal deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/deals/{id}/stage
pub async fn change_deal_stage(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStageRequest>,
) -> Result<Json<Deal>, AppError> {
    require_writer(&user)?;
    let mut deal = load_deal(&state, id).await?;
    let from = deal.stage;
    let event = change_stage(
        &mut deal,
        request.stage,
        request.reason,
        Some(user.id),
        Utc::now(),
    )?;

    state.deals.update_deal(&deal).await?;
    record_event(&state, &event).await;
    tracing::info!(deal_id = %id, from = %from, to = %deal.stage, "Deal stage changed");

    let assignments = state.assignments.list_assignments_for_deal(id).await?;
    for assignment in assignments.iter().filter(|a| a.user_id != user.id) {
        let notification = builders::stage_changed(assignment.user_id, &deal, from, deal.stage);
        if let Err(err) = state.notifications.create_notification(&notification).await {
            tracing::warn!(user_id = %assignment.user_id, error = %err, "Failed to notify assignee");
        }
    }

    Ok(Json(deal))
}

// ============================================================================
// Timeline
// ============================================================================

/// GET /api/deals/{id}/timeline
pub async fn list_timeline(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TimelineEvent>>, AppError> {
    load_deal(&state, id).await?;
    Ok(Json(state.timeline.list_timeline_events(id).await?))
}

/// POST /api/deals/{id}/timeline
pub async fn add_note(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<TimelineEvent>), AppError> {
    require_writer(&user)?;
    validate_note(&request.content)?;
    load_deal(&state, id).await?;

    let event = TimelineEvent::new(
        id,
        TimelineEventType::Note,
        request.content.trim(),
        Some(user.id),
    );
    state.timeline.add_timeline_event(&event).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

// ============================================================================
// Stars
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StarResponse {
    pub starred: bool,
    pub star_count: usize,
}

/// POST /api/deals/{id}/star
///
/// Toggles the current user's star.
pub async fn toggle_star(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StarResponse>, AppError> {
    require_writer(&user)?;
    load_deal(&state, id).await?;

    let starred = if state.stars.remove_star(id, user.id).await? {
        false
    } else {
        state.stars.add_star(&DealStar::new(id, user.id)).await?;
        true
    };
    let star_count = state.stars.list_stars_for_deal(id).await?.len();

    tracing::debug!(deal_id = %id, user_id = %user.id, starred, "Star toggled");
    Ok(Json(StarResponse {
        starred,
        star_count,
    }))
}

/// GET /api/deals/starred
pub async fn list_starred(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DealSummary>>, AppError> {
    let stars = state.stars.list_stars_by_user(user.id).await?;
    let mut summaries = Vec::with_capacity(stars.len());
    for star in stars {
        if let Some(deal) = state.deals.get_deal(star.deal_id).await? {
            summaries.push(summarize(&state, deal, user.id).await?);
        }
    }
    Ok(Json(summaries))
}

// ============================================================================
// Memos
// ============================================================================

/// GET /api/deals/{id}/memos
pub async fn list_memos(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MiniMemo>>, AppError> {
    load_deal(&state, id).await?;
    Ok(Json(state.memos.list_memos_for_deal(id).await?))
}

/// POST /api/deals/{id}/memos
pub async fn create_memo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateMemoRequest>,
) -> Result<(StatusCode, Json<MiniMemo>), AppError> {
    require_writer(&user)?;
    load_deal(&state, id).await?;
    let memo = request.into_memo(id, user.id)?;

    state.memos.create_memo(&memo).await?;
    let event = TimelineEvent::new(
        id,
        TimelineEventType::MemoAdded,
        format!("{} added a memo (score {}/10)", user.full_name, memo.score),
        Some(user.id),
    )
    .with_metadata(serde_json::json!({ "memo_id": memo.id, "score": memo.score }));
    record_event(&state, &event).await;

    tracing::info!(memo_id = %memo.id, deal_id = %id, score = memo.score, "Memo created");
    Ok((StatusCode::CREATED, Json(memo)))
}

// ============================================================================
// Assignments
// ============================================================================

/// GET /api/deals/{id}/assignments
pub async fn list_assignments(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DealAssignment>>, AppError> {
    load_deal(&state, id).await?;
    Ok(Json(state.assignments.list_assignments_for_deal(id).await?))
}

/// POST /api/deals/{id}/assignments
pub async fn assign_user(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignUserRequest>,
) -> Result<(StatusCode, Json<DealAssignment>), AppError> {
    require_writer(&user)?;
    let deal = load_deal(&state, id).await?;
    let assignee: User = state
        .users
        .get_user(request.user_id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "User",
            id: request.user_id.to_string(),
        })?;

    let assignment = DealAssignment::new(id, assignee.id, user.id);
    state.assignments.assign(&assignment).await?;

    let event = TimelineEvent::new(
        id,
        TimelineEventType::Assignment,
        format!("{} assigned {}", user.full_name, assignee.full_name),
        Some(user.id),
    )
    .with_metadata(serde_json::json!({ "assignee": assignee.id }));
    record_event(&state, &event).await;

    if assignee.id != user.id {
        let notification = builders::deal_assigned(assignee.id, &deal, &user.full_name);
        if let Err(err) = state.notifications.create_notification(&notification).await {
            tracing::warn!(user_id = %assignee.id, error = %err, "Failed to notify assignee");
        }
    }

    tracing::info!(deal_id = %id, assignee = %assignee.id, "User assigned to deal");
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// DELETE /api/deals/{id}/assignments/{user_id}
pub async fn unassign_user(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    require_writer(&user)?;
    if !state.assignments.unassign(id, user_id).await? {
        return Err(RepositoryError::NotFound {
            entity_type: "DealAssignment",
            id: format!("{id}/{user_id}"),
        }
        .into());
    }
    tracing::info!(deal_id = %id, user_id = %user_id, "User unassigned from deal");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Related records
// ============================================================================

/// GET /api/deals/{id}/documents
pub async fn list_deal_documents(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, AppError> {
    load_deal(&state, id).await?;
    Ok(Json(state.documents.list_documents_for_deal(id).await?))
}

/// GET /api/deals/{id}/allocations
pub async fn list_deal_allocations(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FundAllocation>>, AppError> {
    load_deal(&state, id).await?;
    Ok(Json(state.funds.list_allocations_by_deal(id).await?))
}
