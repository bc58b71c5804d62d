//! Pipeline and portfolio statistics for the dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::deal::{Deal, DealStage};
use crate::fund::FundSummary;

/// Window for `new_deals_last_30_days`.
pub const NEW_DEAL_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCount {
    pub stage: DealStage,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorCount {
    pub sector: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_deals: usize,
    pub active_deals: usize,
    pub ic_review_count: usize,
    pub invested_count: usize,
    pub rejected_count: usize,
    pub new_deals_last_30_days: usize,
    /// One entry per stage in pipeline order, zeros included.
    pub deals_by_stage: Vec<StageCount>,
    /// Sorted by count, descending. Deals without a sector count as "Unspecified".
    pub deals_by_sector: Vec<SectorCount>,
    pub fund_count: usize,
    pub total_committed: i64,
    pub total_called: i64,
    pub total_aum: i64,
}

pub fn compute_dashboard_stats(
    deals: &[Deal],
    fund_summaries: &[FundSummary],
    now: DateTime<Utc>,
) -> DashboardStats {
    let count_stage = |stage: DealStage| deals.iter().filter(|d| d.stage == stage).count();
    let cutoff = now - Duration::days(NEW_DEAL_WINDOW_DAYS);

    let deals_by_stage = DealStage::ALL
        .into_iter()
        .map(|stage| StageCount {
            stage,
            count: count_stage(stage),
        })
        .collect();

    let mut sectors: BTreeMap<String, usize> = BTreeMap::new();
    for deal in deals {
        let sector = deal
            .sector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unspecified");
        *sectors.entry(sector.to_string()).or_default() += 1;
    }
    let mut deals_by_sector: Vec<SectorCount> = sectors
        .into_iter()
        .map(|(sector, count)| SectorCount { sector, count })
        .collect();
    // Stable sort keeps sector names ascending within equal counts.
    deals_by_sector.sort_by(|a, b| b.count.cmp(&a.count));

    DashboardStats {
        total_deals: deals.len(),
        active_deals: deals.iter().filter(|d| d.stage.is_active()).count(),
        ic_review_count: count_stage(DealStage::IcReview),
        invested_count: count_stage(DealStage::Invested),
        rejected_count: count_stage(DealStage::Rejected),
        new_deals_last_30_days: deals.iter().filter(|d| d.created_at >= cutoff).count(),
        deals_by_stage,
        deals_by_sector,
        fund_count: fund_summaries.len(),
        total_committed: fund_summaries.iter().map(|s| s.committed_capital).sum(),
        total_called: fund_summaries.iter().map(|s| s.called_capital).sum(),
        total_aum: fund_summaries.iter().map(|s| s.aum).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn summary(committed: i64, called: i64, aum: i64) -> FundSummary {
        FundSummary {
            committed_capital: committed,
            called_capital: called,
            uncalled_capital: committed - called,
            total_returned: 0,
            aum,
            allocation_count: 1,
            deal_count: 1,
            deployment_pct: None,
            moic: None,
        }
    }

    #[test]
    fn test_compute_dashboard_stats() {
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let mut old = Deal::new("Old", owner).with_stage(DealStage::Invested);
        old.created_at = now - Duration::days(90);
        old.sector = Some("Fintech".to_string());
        let deals = vec![
            old,
            Deal::new("A", owner).with_sector("Fintech"),
            Deal::new("B", owner)
                .with_sector("Health")
                .with_stage(DealStage::IcReview),
            Deal::new("C", owner).with_stage(DealStage::Rejected),
        ];
        let stats = compute_dashboard_stats(
            &deals,
            &[summary(1_000, 400, 500), summary(2_000, 1_000, 1_500)],
            now,
        );

        assert_eq!(stats.total_deals, 4);
        assert_eq!(stats.active_deals, 2);
        assert_eq!(stats.ic_review_count, 1);
        assert_eq!(stats.invested_count, 1);
        assert_eq!(stats.rejected_count, 1);
        assert_eq!(stats.new_deals_last_30_days, 3);
        assert_eq!(stats.deals_by_stage.len(), DealStage::ALL.len());
        assert_eq!(
            stats.deals_by_stage[0],
            StageCount {
                stage: DealStage::InitialReview,
                count: 1
            }
        );
        assert_eq!(
            stats.deals_by_sector,
            vec![
                SectorCount {
                    sector: "Fintech".to_string(),
                    count: 2
                },
                SectorCount {
                    sector: "Health".to_string(),
                    count: 1
                },
                SectorCount {
                    sector: "Unspecified".to_string(),
                    count: 1
                },
            ]
        );
        assert_eq!(stats.fund_count, 2);
        assert_eq!(stats.total_committed, 3_000);
        assert_eq!(stats.total_called, 1_400);
        assert_eq!(stats.total_aum, 2_000);
    }

    #[test]
    fn test_empty_dashboard_lists_every_stage() {
        let stats = compute_dashboard_stats(&[], &[], Utc::now());
        assert_eq!(stats.total_deals, 0);
        assert!(stats.deals_by_stage.iter().all(|s| s.count == 0));
        assert!(stats.deals_by_sector.is_empty());
    }
}
