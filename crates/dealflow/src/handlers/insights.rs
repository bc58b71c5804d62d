//! Leaderboard and dashboard handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use dealflow_auth::CurrentUser;
use dealflow_core::dashboard::{compute_dashboard_stats, DashboardStats};
use dealflow_core::deal::TimelineEvent;
use dealflow_core::fund::{summarize_fund, FundSummary};
use dealflow_core::leaderboard::{rank_deals, LeaderboardEntry, LeaderboardQuery};

use crate::{handlers::AppError, state::AppState};

const MAX_ACTIVITY: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_activity_limit")]
    pub limit: usize,
}

fn default_activity_limit() -> usize {
    20
}

/// GET /api/leaderboard?limit=
pub async fn leaderboard(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let deals = state.deals.list_deals().await?;
    let stars = state.stars.list_all_stars().await?;
    let memos = state.memos.list_all_memos().await?;

    let mut entries = rank_deals(&deals, &stars, &memos);
    entries.truncate(query.effective_limit());
    Ok(Json(entries))
}

/// GET /api/dashboard/stats
pub async fn dashboard_stats(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let deals = state.deals.list_deals().await?;
    let funds = state.funds.list_funds().await?;
    let allocations = state.funds.list_all_allocations().await?;

    let summaries: Vec<FundSummary> = funds
        .iter()
        .map(|fund| summarize_fund(fund, &allocations))
        .collect();
    Ok(Json(compute_dashboard_stats(&deals, &summaries, Utc::now())))
}

/// GET /api/dashboard/activity?limit=
///
/// Recent timeline events across all deals, newest first.
pub async fn recent_activity(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<TimelineEvent>>, AppError> {
    let limit = query.limit.clamp(1, MAX_ACTIVITY);
    Ok(Json(state.timeline.list_recent_timeline_events(limit).await?))
}
