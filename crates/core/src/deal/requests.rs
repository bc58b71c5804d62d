//! API request types for deal operations.
//!
//! Pure data types with conversion helpers. Validation of the resulting
//! domain values lives in `operations`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MemoError;
use super::operations::validate_memo_score;
use super::types::{Deal, DealStage, MiniMemo};
use crate::serde::deserialize_optional_string;

/// Request payload for creating a new deal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDealRequest {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<DealStage>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub round: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_raise: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub lead_investor: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub contact_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub contact_email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub website: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateDealRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// Convert into a deal owned by `created_by`.
    pub fn into_deal(self, created_by: Uuid) -> Deal {
        let mut deal = Deal::new(self.name.trim(), created_by);
        deal.description = self.description;
        deal.sector = self.sector.map(|s| s.trim().to_string());
        deal.stage = self.stage.unwrap_or(DealStage::InitialReview);
        deal.round = self.round;
        deal.target_raise = self.target_raise;
        deal.valuation = self.valuation;
        deal.lead_investor = self.lead_investor;
        deal.contact_name = self.contact_name;
        deal.contact_email = self.contact_email.map(|e| e.trim().to_lowercase());
        deal.website = self.website;
        deal.tags = normalize_tags(self.tags);
        deal
    }
}

/// Request payload for updating deal details. Stage changes go through
/// [`ChangeStageRequest`] so they always leave a timeline entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDealRequest {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub round: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_raise: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub lead_investor: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub contact_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub contact_email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateDealRequest {
    /// Apply updates to an existing deal. Callers validate the result.
    pub fn apply_to(self, deal: &mut Deal) {
        if let Some(name) = self.name {
            deal.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            deal.description = Some(description);
        }
        if let Some(sector) = self.sector {
            deal.sector = Some(sector.trim().to_string());
        }
        if let Some(round) = self.round {
            deal.round = Some(round);
        }
        if let Some(target_raise) = self.target_raise {
            deal.target_raise = Some(target_raise);
        }
        if let Some(valuation) = self.valuation {
            deal.valuation = Some(valuation);
        }
        if let Some(lead_investor) = self.lead_investor {
            deal.lead_investor = Some(lead_investor);
        }
        if let Some(contact_name) = self.contact_name {
            deal.contact_name = Some(contact_name);
        }
        if let Some(contact_email) = self.contact_email {
            deal.contact_email = Some(contact_email.trim().to_lowercase());
        }
        if let Some(website) = self.website {
            deal.website = Some(website);
        }
        if let Some(tags) = self.tags {
            deal.tags = normalize_tags(tags);
        }
    }
}

/// Request payload for moving a deal through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStageRequest {
    pub stage: DealStage,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub reason: Option<String>,
}

/// Request payload for a free-form timeline note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub content: String,
}

/// Request payload for writing a memo on a deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemoRequest {
    pub thesis: String,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub risks: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub value_creation: Option<String>,
    pub score: i64,
}

impl CreateMemoRequest {
    /// Convert into a memo, rejecting out-of-range scores.
    pub fn into_memo(self, deal_id: Uuid, user_id: Uuid) -> Result<MiniMemo, MemoError> {
        let score = validate_memo_score(self.score)?;
        let mut memo = MiniMemo::new(deal_id, user_id, self.thesis.trim(), score);
        memo.risks = self.risks;
        memo.value_creation = self.value_creation;
        Ok(memo)
    }
}

/// Request payload for editing a memo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMemoRequest {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub thesis: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub risks: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub value_creation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

impl UpdateMemoRequest {
    pub fn apply_to(self, memo: &mut MiniMemo) -> Result<(), MemoError> {
        if let Some(score) = self.score {
            memo.score = validate_memo_score(score)?;
        }
        if let Some(thesis) = self.thesis {
            memo.thesis = thesis.trim().to_string();
        }
        if let Some(risks) = self.risks {
            memo.risks = Some(risks);
        }
        if let Some(value_creation) = self.value_creation {
            memo.value_creation = Some(value_creation);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignUserRequest {
    pub user_id: Uuid,
}

/// Query parameters for listing deals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<DealStage>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    /// Only deals starred by the requesting user.
    #[serde(default)]
    pub starred: bool,
    /// Only deals assigned to the requesting user.
    #[serde(default)]
    pub assigned: bool,
}

/// Trims, drops empty and de-duplicates tags while keeping their order.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_into_deal_normalizes_fields() {
        let request = CreateDealRequest {
            name: "  Acme Robotics ".to_string(),
            contact_email: Some("Founder@Acme.io".to_string()),
            tags: vec![
                "robotics".to_string(),
                " Robotics ".to_string(),
                "".to_string(),
                "b2b".to_string(),
            ],
            ..Default::default()
        };
        let deal = request.into_deal(Uuid::nil());

        assert_eq!(deal.name, "Acme Robotics");
        assert_eq!(deal.contact_email.as_deref(), Some("founder@acme.io"));
        assert_eq!(deal.tags, vec!["robotics", "b2b"]);
        assert_eq!(deal.stage, DealStage::InitialReview);
    }

    #[test]
    fn test_create_request_deserializes_with_defaults() {
        let request: CreateDealRequest =
            serde_json::from_str(r#"{"name": "Acme", "sector": "", "stage": "screening"}"#)
                .unwrap();
        assert!(request.sector.is_none());
        assert_eq!(request.stage, Some(DealStage::Screening));
        assert!(request.tags.is_empty());
    }

    #[test]
    fn test_update_request_applies_only_present_fields() {
        let mut deal = Deal::new("Acme", Uuid::nil()).with_sector("Fintech");
        let update = UpdateDealRequest {
            round: Some("Series A".to_string()),
            valuation: Some(5_000_000_000),
            ..Default::default()
        };
        update.apply_to(&mut deal);

        assert_eq!(deal.name, "Acme");
        assert_eq!(deal.sector.as_deref(), Some("Fintech"));
        assert_eq!(deal.round.as_deref(), Some("Series A"));
        assert_eq!(deal.valuation, Some(5_000_000_000));
    }

    #[test]
    fn test_memo_request_rejects_out_of_range_score() {
        let request = CreateMemoRequest {
            thesis: "Big market".to_string(),
            risks: None,
            value_creation: None,
            score: 0,
        };
        assert_eq!(
            request.into_memo(Uuid::nil(), Uuid::nil()),
            Err(MemoError::ScoreOutOfRange(0))
        );
    }

    #[test]
    fn test_update_memo_request_keeps_memo_on_bad_score() {
        let mut memo = MiniMemo::new(Uuid::nil(), Uuid::nil(), "Thesis", 7);
        let update = UpdateMemoRequest {
            thesis: Some("Changed".to_string()),
            score: Some(42),
            ..Default::default()
        };
        assert!(update.apply_to(&mut memo).is_err());
        assert_eq!(memo.thesis, "Thesis");
        assert_eq!(memo.score, 7);
    }

    #[test]
    fn test_deal_filter_from_query_json() {
        let filter: DealFilter =
            serde_json::from_str(r#"{"stage": "ic_review", "search": "", "starred": true}"#)
                .unwrap();
        assert_eq!(filter.stage, Some(DealStage::IcReview));
        assert!(filter.search.is_none());
        assert!(filter.starred);
        assert!(!filter.assigned);
    }
}
