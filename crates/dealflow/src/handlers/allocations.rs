//! Allocation handlers. Every write goes through the fund ledger.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use dealflow_auth::CurrentUser;
use dealflow_core::fund::{
    call_view, CapitalCallView, CreateAllocationRequest, CreateCapitalCallRequest,
    ScheduleCallsRequest, UpdateAllocationRequest,
};
use dealflow_core::storage::RepositoryError;

use super::authz::require_fund_manager;
use super::funds::AllocationView;
use crate::{handlers::AppError, state::AppState};

/// POST /api/allocations
pub async fn create_allocation(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateAllocationRequest>,
) -> Result<(StatusCode, Json<AllocationView>), AppError> {
    require_fund_manager(&user)?;
    let allocation = state.ledger.create_allocation(request, &user).await?;
    Ok((StatusCode::CREATED, Json(allocation.into())))
}

/// GET /api/allocations/{id}
pub async fn get_allocation(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AllocationView>, AppError> {
    let allocation = state
        .funds
        .get_allocation(id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "FundAllocation",
            id: id.to_string(),
        })?;
    Ok(Json(allocation.into()))
}

/// PUT /api/allocations/{id}
pub async fn update_allocation(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAllocationRequest>,
) -> Result<Json<AllocationView>, AppError> {
    require_fund_manager(&user)?;
    let allocation = state.ledger.update_allocation(id, request).await?;
    Ok(Json(allocation.into()))
}

/// DELETE /api/allocations/{id}
///
/// Removes the allocation together with its capital calls.
pub async fn delete_allocation(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_fund_manager(&user)?;
    state.ledger.delete_allocation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/allocations/{id}/capital-calls
pub async fn list_allocation_calls(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CapitalCallView>>, AppError> {
    if state.funds.get_allocation(id).await?.is_none() {
        return Err(RepositoryError::NotFound {
            entity_type: "FundAllocation",
            id: id.to_string(),
        }
        .into());
    }
    let today = Utc::now().date_naive();
    let calls = state.funds.list_capital_calls_by_allocation(id).await?;
    Ok(Json(
        calls.into_iter().map(|c| call_view(c, today)).collect(),
    ))
}

/// POST /api/allocations/{id}/capital-calls
pub async fn create_capital_call(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateCapitalCallRequest>,
) -> Result<(StatusCode, Json<CapitalCallView>), AppError> {
    require_fund_manager(&user)?;
    let call = state.ledger.create_capital_call(id, request, &user).await?;
    Ok((
        StatusCode::CREATED,
        Json(call_view(call, Utc::now().date_naive())),
    ))
}

/// POST /api/allocations/{id}/capital-calls/schedule
pub async fn schedule_capital_calls(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ScheduleCallsRequest>,
) -> Result<(StatusCode, Json<Vec<CapitalCallView>>), AppError> {
    require_fund_manager(&user)?;
    let calls = state
        .ledger
        .schedule_capital_calls(id, request, &user)
        .await?;
    let today = Utc::now().date_naive();
    Ok((
        StatusCode::CREATED,
        Json(calls.into_iter().map(|c| call_view(c, today)).collect()),
    ))
}
