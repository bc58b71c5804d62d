use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::error::{DealError, MemoError};
use super::requests::DealFilter;
use super::types::{
    Deal, DealAssignment, DealStage, DealStar, MiniMemo, TimelineEvent, TimelineEventType,
};
use crate::user::validate_email;

/// Validates a deal before creation or update.
pub fn validate_deal(deal: &Deal) -> Result<(), DealError> {
    if deal.name.trim().is_empty() {
        return Err(DealError::EmptyName);
    }
    if deal.name.chars().count() > 200 {
        return Err(DealError::NameTooLong);
    }
    if deal.target_raise.is_some_and(|v| v < 0) {
        return Err(DealError::NegativeAmount("target_raise"));
    }
    if deal.valuation.is_some_and(|v| v < 0) {
        return Err(DealError::NegativeAmount("valuation"));
    }
    if let Some(email) = &deal.contact_email {
        validate_email(email).map_err(|_| DealError::InvalidContactEmail(email.clone()))?;
    }
    if deal.stage == DealStage::Rejected
        && deal
            .rejection_reason
            .as_deref()
            .is_none_or(|r| r.trim().is_empty())
    {
        return Err(DealError::MissingRejectionReason);
    }
    Ok(())
}

/// Filters deals by the list query.
///
/// `starred` and `assigned` hold the deal IDs starred by / assigned to the
/// requesting user; they are only consulted when the filter asks for them.
pub fn filter_deals<'a>(
    deals: &'a [Deal],
    filter: &DealFilter,
    starred: &HashSet<Uuid>,
    assigned: &HashSet<Uuid>,
) -> Vec<&'a Deal> {
    let search = filter.search.as_deref().map(str::to_lowercase);
    deals
        .iter()
        .filter(|deal| {
            filter.stage.is_none_or(|stage| deal.stage == stage)
                && filter.sector.as_deref().is_none_or(|sector| {
                    deal.sector
                        .as_deref()
                        .is_some_and(|s| s.eq_ignore_ascii_case(sector))
                })
                && search.as_deref().is_none_or(|q| deal_matches_search(deal, q))
                && (!filter.starred || starred.contains(&deal.id))
                && (!filter.assigned || assigned.contains(&deal.id))
        })
        .collect()
}

fn deal_matches_search(deal: &Deal, query: &str) -> bool {
    let contains = |s: &str| s.to_lowercase().contains(query);
    contains(deal.name.as_str())
        || deal.description.as_deref().is_some_and(contains)
        || deal.sector.as_deref().is_some_and(contains)
        || deal.tags.iter().any(|t| contains(t.as_str()))
}

/// Sorts deals most recently updated first.
pub fn sort_deals_by_recent(deals: &mut [Deal]) {
    deals.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.name.cmp(&b.name)));
}

/// The timeline entry recorded when a deal is created.
pub fn creation_event(deal: &Deal, actor: Uuid) -> TimelineEvent {
    TimelineEvent::new(
        deal.id,
        TimelineEventType::Created,
        format!("Deal created in {}", deal.stage.label()),
        Some(actor),
    )
    .with_metadata(json!({ "stage": deal.stage }))
}

/// Moves a deal to another stage and returns the timeline entry describing it.
///
/// Rejecting a deal requires a reason; leaving the rejected stage clears it.
/// The deal is left untouched when an error is returned.
pub fn change_stage(
    deal: &mut Deal,
    to: DealStage,
    reason: Option<String>,
    actor: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<TimelineEvent, DealError> {
    let from = deal.stage;
    if from == to {
        return Err(DealError::StageUnchanged(to));
    }
    let reason = reason.filter(|r| !r.trim().is_empty());
    if to == DealStage::Rejected && reason.is_none() {
        return Err(DealError::MissingRejectionReason);
    }

    deal.stage = to;
    deal.updated_at = now;
    deal.rejection_reason = if to == DealStage::Rejected {
        reason.clone()
    } else {
        None
    };

    let mut content = format!("Moved from {} to {}", from.label(), to.label());
    if let Some(reason) = &reason {
        content.push_str(": ");
        content.push_str(reason);
    }
    let mut event = TimelineEvent::new(deal.id, TimelineEventType::StageChange, content, actor)
        .with_metadata(json!({ "from": from, "to": to, "reason": reason }));
    event.created_at = now;
    Ok(event)
}

/// Validates a memo score and narrows it to `u8`.
pub fn validate_memo_score(score: i64) -> Result<u8, MemoError> {
    if (1..=10).contains(&score) {
        Ok(score as u8)
    } else {
        Err(MemoError::ScoreOutOfRange(score))
    }
}

pub fn validate_memo(memo: &MiniMemo) -> Result<(), MemoError> {
    if memo.thesis.trim().is_empty() {
        return Err(MemoError::EmptyThesis);
    }
    validate_memo_score(memo.score as i64).map(|_| ())
}

pub fn validate_comment(content: &str) -> Result<(), MemoError> {
    if content.trim().is_empty() {
        return Err(MemoError::EmptyComment);
    }
    Ok(())
}

pub fn validate_note(content: &str) -> Result<(), MemoError> {
    if content.trim().is_empty() {
        return Err(MemoError::EmptyNote);
    }
    Ok(())
}

/// Mean memo score, `None` without memos.
pub fn average_memo_score(memos: &[&MiniMemo]) -> Option<f64> {
    if memos.is_empty() {
        return None;
    }
    let total: u32 = memos.iter().map(|m| m.score as u32).sum();
    Some(total as f64 / memos.len() as f64)
}

/// A deal with its engagement counters, as returned by the deal endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealSummary {
    #[serde(flatten)]
    pub deal: Deal,
    pub star_count: usize,
    pub starred_by_me: bool,
    pub memo_count: usize,
    pub average_memo_score: Option<f64>,
    pub assignees: Vec<Uuid>,
}

/// Builds a [`DealSummary`] from rows already fetched for the deal.
///
/// Rows belonging to other deals are ignored, so callers may pass unfiltered slices.
pub fn summarize_deal(
    deal: Deal,
    stars: &[DealStar],
    memos: &[MiniMemo],
    assignments: &[DealAssignment],
    viewer: Uuid,
) -> DealSummary {
    let deal_stars: Vec<&DealStar> = stars.iter().filter(|s| s.deal_id == deal.id).collect();
    let deal_memos: Vec<&MiniMemo> = memos.iter().filter(|m| m.deal_id == deal.id).collect();
    let assignees = assignments
        .iter()
        .filter(|a| a.deal_id == deal.id)
        .map(|a| a.user_id)
        .collect();

    DealSummary {
        star_count: deal_stars.len(),
        starred_by_me: deal_stars.iter().any(|s| s.user_id == viewer),
        memo_count: deal_memos.len(),
        average_memo_score: average_memo_score(&deal_memos),
        assignees,
        deal,
    }
}
