use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline stage of a deal, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    InitialReview,
    Screening,
    Diligence,
    IcReview,
    Closing,
    Closed,
    Invested,
    Rejected,
}

impl DealStage {
    pub const ALL: [DealStage; 8] = [
        DealStage::InitialReview,
        DealStage::Screening,
        DealStage::Diligence,
        DealStage::IcReview,
        DealStage::Closing,
        DealStage::Closed,
        DealStage::Invested,
        DealStage::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::InitialReview => "initial_review",
            DealStage::Screening => "screening",
            DealStage::Diligence => "diligence",
            DealStage::IcReview => "ic_review",
            DealStage::Closing => "closing",
            DealStage::Closed => "closed",
            DealStage::Invested => "invested",
            DealStage::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == value)
    }

    /// Human-readable label used in timeline entries and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            DealStage::InitialReview => "Initial Review",
            DealStage::Screening => "Screening",
            DealStage::Diligence => "Diligence",
            DealStage::IcReview => "IC Review",
            DealStage::Closing => "Closing",
            DealStage::Closed => "Closed",
            DealStage::Invested => "Invested",
            DealStage::Rejected => "Rejected",
        }
    }

    /// Deals still moving through the pipeline.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            DealStage::Closed | DealStage::Invested | DealStage::Rejected
        )
    }
}

impl std::fmt::Display for DealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prospective or completed investment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub stage: DealStage,
    /// Financing round, e.g. "Seed" or "Series A".
    pub round: Option<String>,
    /// Amount the company is raising, in cents.
    pub target_raise: Option<i64>,
    /// Pre-money valuation, in cents.
    pub valuation: Option<i64>,
    pub lead_investor: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub website: Option<String>,
    pub tags: Vec<String>,
    pub rejection_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// Creates a deal in the initial review stage.
    pub fn new(name: impl Into<String>, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            sector: None,
            stage: DealStage::InitialReview,
            round: None,
            target_raise: None,
            valuation: None,
            lead_investor: None,
            contact_name: None,
            contact_email: None,
            website: None,
            tags: Vec::new(),
            rejection_reason: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets a specific ID for this deal (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_stage(mut self, stage: DealStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Kind of entry on a deal's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventType {
    Created,
    StageChange,
    Note,
    MemoAdded,
    DocumentAdded,
    Assignment,
    Allocation,
    CapitalCall,
}

impl TimelineEventType {
    pub const ALL: [TimelineEventType; 8] = [
        TimelineEventType::Created,
        TimelineEventType::StageChange,
        TimelineEventType::Note,
        TimelineEventType::MemoAdded,
        TimelineEventType::DocumentAdded,
        TimelineEventType::Assignment,
        TimelineEventType::Allocation,
        TimelineEventType::CapitalCall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineEventType::Created => "created",
            TimelineEventType::StageChange => "stage_change",
            TimelineEventType::Note => "note",
            TimelineEventType::MemoAdded => "memo_added",
            TimelineEventType::DocumentAdded => "document_added",
            TimelineEventType::Assignment => "assignment",
            TimelineEventType::Allocation => "allocation",
            TimelineEventType::CapitalCall => "capital_call",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

/// An entry in the activity history of a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub event_type: TimelineEventType,
    pub content: String,
    /// Structured details, e.g. `{"from": "screening", "to": "diligence"}`.
    pub metadata: serde_json::Value,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TimelineEvent {
    pub fn new(
        deal_id: Uuid,
        event_type: TimelineEventType,
        content: impl Into<String>,
        user_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            deal_id,
            event_type,
            content: content.into(),
            metadata: serde_json::Value::Null,
            user_id,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A user's bookmark on a deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealStar {
    pub deal_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl DealStar {
    pub fn new(deal_id: Uuid, user_id: Uuid) -> Self {
        Self {
            deal_id,
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// A short investment memo with a conviction score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniMemo {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub user_id: Uuid,
    pub thesis: String,
    pub risks: Option<String>,
    pub value_creation: Option<String>,
    /// Conviction from 1 (pass) to 10 (must do).
    pub score: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MiniMemo {
    pub fn new(deal_id: Uuid, user_id: Uuid, thesis: impl Into<String>, score: u8) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            deal_id,
            user_id,
            thesis: thesis.into(),
            risks: None,
            value_creation: None,
            score,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A reply on a memo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoComment {
    pub id: Uuid,
    pub memo_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MemoComment {
    pub fn new(memo_id: Uuid, user_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            memo_id,
            user_id,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A team member responsible for a deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealAssignment {
    pub deal_id: Uuid,
    pub user_id: Uuid,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
}

impl DealAssignment {
    pub fn new(deal_id: Uuid, user_id: Uuid, assigned_by: Uuid) -> Self {
        Self {
            deal_id,
            user_id,
            assigned_by,
            assigned_at: Utc::now(),
        }
    }
}
