//! Ranking of deals by team conviction.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::deal::{average_memo_score, Deal, DealStage, DealStar, MiniMemo};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub deal_id: Uuid,
    pub name: String,
    pub stage: DealStage,
    pub sector: Option<String>,
    pub star_count: usize,
    pub memo_count: usize,
    pub average_memo_score: Option<f64>,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl LeaderboardQuery {
    /// Requested limit, clamped to `1..=MAX_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// `average memo score * 10 + stars * 2 + memo count`.
pub fn conviction_score(
    average_memo_score: Option<f64>,
    star_count: usize,
    memo_count: usize,
) -> f64 {
    average_memo_score.unwrap_or(0.0) * 10.0 + star_count as f64 * 2.0 + memo_count as f64
}

/// Rank non-rejected deals by conviction score.
///
/// Ties go to the deal with more stars, then to the name in ascending order.
pub fn rank_deals(
    deals: &[Deal],
    stars: &[DealStar],
    memos: &[MiniMemo],
) -> Vec<LeaderboardEntry> {
    let mut star_counts: HashMap<Uuid, usize> = HashMap::new();
    for star in stars {
        *star_counts.entry(star.deal_id).or_default() += 1;
    }
    let mut memos_by_deal: HashMap<Uuid, Vec<&MiniMemo>> = HashMap::new();
    for memo in memos {
        memos_by_deal.entry(memo.deal_id).or_default().push(memo);
    }

    let mut entries: Vec<LeaderboardEntry> = deals
        .iter()
        .filter(|d| d.stage != DealStage::Rejected)
        .map(|deal| {
            let star_count = star_counts.get(&deal.id).copied().unwrap_or(0);
            let deal_memos = memos_by_deal.get(&deal.id).map(Vec::as_slice).unwrap_or(&[]);
            let average = average_memo_score(deal_memos);
            LeaderboardEntry {
                rank: 0,
                deal_id: deal.id,
                name: deal.name.clone(),
                stage: deal.stage,
                sector: deal.sector.clone(),
                star_count,
                memo_count: deal_memos.len(),
                average_memo_score: average,
                score: conviction_score(average, star_count, deal_memos.len()),
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.star_count.cmp(&a.star_count))
            .then_with(|| a.name.cmp(&b.name))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}
