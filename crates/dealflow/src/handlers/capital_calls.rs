//! Capital call handlers.
//!
//! Reads present calls with their effective status for today. Writes go
//! through the fund ledger.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use dealflow_auth::CurrentUser;
use dealflow_core::fund::{
    call_view, CapitalCallQuery, CapitalCallStatus, CapitalCallView, RecordPaymentRequest,
    UpdateCallStatusRequest,
};
use dealflow_core::storage::{DateRange, RepositoryError};

use super::authz::require_fund_manager;
use crate::{handlers::AppError, state::AppState};

/// Largest look-ahead accepted by the upcoming calls listing.
const MAX_UPCOMING_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    #[serde(default = "default_upcoming_days")]
    pub days: i64,
}

fn default_upcoming_days() -> i64 {
    30
}

/// GET /api/capital-calls?status=&fund_id=
pub async fn list_capital_calls(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<CapitalCallQuery>,
) -> Result<Json<Vec<CapitalCallView>>, AppError> {
    let calls = match query.fund_id {
        Some(fund_id) => state.funds.list_capital_calls_by_fund(fund_id).await?,
        None => state.funds.list_all_capital_calls().await?,
    };

    let today = Utc::now().date_naive();
    let views = calls
        .into_iter()
        .map(|call| call_view(call, today))
        .filter(|view| query.status.is_none_or(|s| view.effective_status == s))
        .collect();
    Ok(Json(views))
}

/// GET /api/capital-calls/upcoming?days=
///
/// Unpaid calls due within the window, soonest first. Overdue calls are
/// included.
pub async fn list_upcoming_calls(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<CapitalCallView>>, AppError> {
    if !(0..=MAX_UPCOMING_DAYS).contains(&query.days) {
        return Err(AppError::bad_request(format!(
            "days must be between 0 and {MAX_UPCOMING_DAYS}"
        )));
    }
    let today = Utc::now().date_naive();
    let window = DateRange::next_days(today, query.days as u32)
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let mut views: Vec<CapitalCallView> = state
        .funds
        .list_all_capital_calls()
        .await?
        .into_iter()
        .filter(|call| {
            (call.due_date < window.start || window.contains(call.due_date))
                && !matches!(
                    call.status,
                    CapitalCallStatus::Paid | CapitalCallStatus::Defaulted
                )
        })
        .map(|call| call_view(call, today))
        .collect();
    views.sort_by(|a, b| {
        a.call
            .due_date
            .cmp(&b.call.due_date)
            .then_with(|| a.call.call_number.cmp(&b.call.call_number))
    });
    Ok(Json(views))
}

/// GET /api/capital-calls/{id}
pub async fn get_capital_call(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CapitalCallView>, AppError> {
    let call = state
        .funds
        .get_capital_call(id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            entity_type: "CapitalCall",
            id: id.to_string(),
        })?;
    Ok(Json(call_view(call, Utc::now().date_naive())))
}

/// DELETE /api/capital-calls/{id}
///
/// Only calls without recorded payments can be deleted.
pub async fn delete_capital_call(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_fund_manager(&user)?;
    state.ledger.delete_capital_call(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/capital-calls/{id}/payments
pub async fn record_payment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<CapitalCallView>, AppError> {
    require_fund_manager(&user)?;
    let call = state.ledger.record_payment(id, request, &user).await?;
    Ok(Json(call_view(call, Utc::now().date_naive())))
}

/// PATCH /api/capital-calls/{id}/status
pub async fn change_call_status(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCallStatusRequest>,
) -> Result<Json<CapitalCallView>, AppError> {
    require_fund_manager(&user)?;
    let call = state
        .ledger
        .change_call_status(id, request.status, &user)
        .await?;
    Ok(Json(call_view(call, Utc::now().date_naive())))
}
