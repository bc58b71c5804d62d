//! Startup data: the bootstrap admin and an optional demo dataset.

use chrono::{Months, Utc};

use dealflow_core::auth::hash_password;
use dealflow_core::deal::{creation_event, Deal, DealStage, DealStar, MiniMemo};
use dealflow_core::fund::{
    CallFrequency, CreateAllocationRequest, Fund, ScheduleCallsRequest, SecurityType,
};
use dealflow_core::user::{User, UserRole};

use crate::state::AppState;

/// Password shared by the demo accounts.
pub const DEMO_PASSWORD: &str = "dealflow-demo";

/// Create the admin account from configuration.
///
/// Does nothing when no admin password is configured or the username is
/// already taken. Returns whether an account was created.
pub async fn bootstrap_admin(state: &AppState) -> anyhow::Result<bool> {
    let Some(password) = state.config.admin_password.clone() else {
        return Ok(false);
    };
    let username = state.config.admin_username.clone();
    if state.users.get_user_by_username(&username).await?.is_some() {
        tracing::debug!(username = %username, "Admin account already exists");
        return Ok(false);
    }

    let admin = User::new(
        username.as_str(),
        "Administrator",
        format!("{username}@dealflow.local"),
        UserRole::Admin,
    );
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await?;
    state.users.create_user(&admin, &password_hash).await?;

    tracing::info!(user_id = %admin.id, username = %admin.username, "Bootstrap admin created");
    Ok(true)
}

/// Insert sample users, deals, a fund, allocations and capital calls.
///
/// Skipped when any deal exists. Returns whether data was inserted.
pub async fn seed_demo(state: &AppState) -> anyhow::Result<bool> {
    if !state.deals.list_deals().await?.is_empty() {
        tracing::info!("Store is not empty, skipping demo data");
        return Ok(false);
    }

    let password_hash = tokio::task::spawn_blocking(|| hash_password(DEMO_PASSWORD)).await?;
    let mut users = Vec::new();
    for (username, full_name, role) in [
        ("maria", "Maria Lopez", UserRole::Partner),
        ("james", "James Okafor", UserRole::Analyst),
        ("lena", "Lena Fischer", UserRole::Analyst),
        ("sam", "Sam Reed", UserRole::Observer),
    ] {
        if let Some(existing) = state.users.get_user_by_username(username).await? {
            users.push(existing);
            continue;
        }
        let user = User::new(
            username,
            full_name,
            format!("{username}@dealflow.local"),
            role,
        );
        state.users.create_user(&user, &password_hash).await?;
        users.push(user);
    }
    let partner = &users[0];
    let analyst = &users[1];
    let second_analyst = &users[2];

    let deals = vec![
        Deal::new("Helio Grid", analyst.id)
            .with_sector("Energy")
            .with_stage(DealStage::Diligence)
            .with_description("Software for community solar operators")
            .with_tags(vec!["climate".to_string(), "saas".to_string()]),
        Deal::new("Ledgerly", partner.id)
            .with_sector("Fintech")
            .with_stage(DealStage::IcReview)
            .with_description("Accounts payable automation for mid-market firms"),
        Deal::new("Northwind Bio", second_analyst.id)
            .with_sector("Healthcare")
            .with_stage(DealStage::Screening),
        Deal::new("Quarry AI", analyst.id)
            .with_sector("Industrial")
            .with_stage(DealStage::InitialReview)
            .with_tags(vec!["ai".to_string()]),
        Deal::new("Tidewater Logistics", partner.id)
            .with_sector("Logistics")
            .with_stage(DealStage::Closing),
    ];
    for deal in &deals {
        state.deals.create_deal(deal).await?;
        state
            .timeline
            .add_timeline_event(&creation_event(deal, deal.created_by))
            .await?;
    }

    for (deal, author, thesis, score) in [
        (&deals[0], analyst, "Sticky product with a regulatory tailwind", 8),
        (&deals[1], partner, "Strong founders, crowded market", 6),
        (&deals[1], second_analyst, "Net retention above 130%", 9),
    ] {
        state
            .memos
            .create_memo(&MiniMemo::new(deal.id, author.id, thesis, score))
            .await?;
    }
    for (deal, user) in [
        (&deals[0], partner),
        (&deals[0], second_analyst),
        (&deals[1], analyst),
    ] {
        state.stars.add_star(&DealStar::new(deal.id, user.id)).await?;
    }

    let fund = Fund::new("Dealflow Fund I").with_target_size(5_000_000_000);
    state.funds.create_fund(&fund).await?;

    let today = Utc::now().date_naive();
    let start = today.checked_sub_months(Months::new(3)).unwrap_or(today);
    for (deal, amount, security_type) in [
        (&deals[1], 250_000_000, SecurityType::Equity),
        (&deals[4], 100_000_000, SecurityType::Safe),
    ] {
        let allocation = state
            .ledger
            .create_allocation(
                CreateAllocationRequest {
                    fund_id: fund.id,
                    deal_id: deal.id,
                    amount,
                    security_type: Some(security_type),
                    allocation_date: Some(start),
                    market_value: None,
                    notes: None,
                },
                partner,
            )
            .await?;
        state
            .ledger
            .schedule_capital_calls(
                allocation.id,
                ScheduleCallsRequest::periodic(CallFrequency::Quarterly, start, 4),
                partner,
            )
            .await?;
    }

    tracing::info!(
        users = users.len(),
        deals = deals.len(),
        fund_id = %fund.id,
        "Demo data inserted"
    );
    Ok(true)
}
