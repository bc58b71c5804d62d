//! Fund handlers.
//!
//! Creation and reads go straight to the repository. Updates and deletes
//! run through the ledger so they see a consistent set of allocations.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use dealflow_auth::CurrentUser;
use dealflow_core::fund::{
    allocation_moic, summarize_fund, validate_fund, CreateFundRequest, Fund, FundAllocation,
    FundSummary, UpdateFundRequest,
};
use dealflow_core::storage::RepositoryError;

use super::authz::require_fund_manager;
use crate::{handlers::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct FundWithSummary {
    #[serde(flatten)]
    pub fund: Fund,
    pub summary: FundSummary,
}

/// An allocation with its multiple on invested capital.
#[derive(Debug, Serialize)]
pub struct AllocationView {
    #[serde(flatten)]
    pub allocation: FundAllocation,
    pub moic: Option<f64>,
}

impl From<FundAllocation> for AllocationView {
    fn from(allocation: FundAllocation) -> Self {
        Self {
            moic: allocation_moic(&allocation),
            allocation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FundDetail {
    pub fund: Fund,
    pub summary: FundSummary,
    pub allocations: Vec<AllocationView>,
}

async fn load_fund(state: &AppState, id: Uuid) -> Result<Fund, AppError> {
    Ok(state
        .funds
        .get_fund(id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "Fund",
            id: id.to_string(),
        })?)
}

/// GET /api/funds
pub async fn list_funds(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<FundWithSummary>>, AppError> {
    let funds = state.funds.list_funds().await?;
    let allocations = state.funds.list_all_allocations().await?;

    let result = funds
        .into_iter()
        .map(|fund| FundWithSummary {
            summary: summarize_fund(&fund, &allocations),
            fund,
        })
        .collect();
    Ok(Json(result))
}

/// POST /api/funds
pub async fn create_fund(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateFundRequest>,
) -> Result<(StatusCode, Json<Fund>), AppError> {
    require_fund_manager(&user)?;
    let fund = request.into_fund();
    validate_fund(&fund)?;

    state.funds.create_fund(&fund).await?;
    tracing::info!(fund_id = %fund.id, name = %fund.name, currency = %fund.currency, "Fund created");
    Ok((StatusCode::CREATED, Json(fund)))
}

/// GET /api/funds/{id}
pub async fn get_fund(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FundDetail>, AppError> {
    let fund = load_fund(&state, id).await?;
    let allocations = state.funds.list_allocations_by_fund(id).await?;
    let summary = summarize_fund(&fund, &allocations);

    Ok(Json(FundDetail {
        fund,
        summary,
        allocations: allocations.into_iter().map(AllocationView::from).collect(),
    }))
}

/// PUT /api/funds/{id}
pub async fn update_fund(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateFundRequest>,
) -> Result<Json<Fund>, AppError> {
    require_fund_manager(&user)?;
    Ok(Json(state.ledger.update_fund(id, request).await?))
}

/// DELETE /api/funds/{id}
pub async fn delete_fund(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_fund_manager(&user)?;
    state.ledger.delete_fund(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/funds/{id}/allocations
pub async fn list_fund_allocations(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AllocationView>>, AppError> {
    load_fund(&state, id).await?;
    let allocations = state.funds.list_allocations_by_fund(id).await?;
    Ok(Json(
        allocations.into_iter().map(AllocationView::from).collect(),
    ))
}

/// POST /api/funds/{id}/recalculate-weights
pub async fn recalculate_weights(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AllocationView>>, AppError> {
    require_fund_manager(&user)?;
    let allocations = state.ledger.recalculate_weights(id).await?;
    Ok(Json(
        allocations.into_iter().map(AllocationView::from).collect(),
    ))
}
