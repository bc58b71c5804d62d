use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DealAssigned,
    StageChanged,
    MemoComment,
    CapitalCall,
    PaymentRecorded,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::DealAssigned => "deal_assigned",
            NotificationKind::StageChanged => "stage_changed",
            NotificationKind::MemoComment => "memo_comment",
            NotificationKind::CapitalCall => "capital_call",
            NotificationKind::PaymentRecorded => "payment_recorded",
            NotificationKind::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "deal_assigned" => Some(NotificationKind::DealAssigned),
            "stage_changed" => Some(NotificationKind::StageChanged),
            "memo_comment" => Some(NotificationKind::MemoComment),
            "capital_call" => Some(NotificationKind::CapitalCall),
            "payment_recorded" => Some(NotificationKind::PaymentRecorded),
            "system" => Some(NotificationKind::System),
            _ => None,
        }
    }
}

/// A message addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub deal_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            deal_id: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn for_deal(mut self, deal_id: Uuid) -> Self {
        self.deal_id = Some(deal_id);
        self
    }
}

/// Query parameters for listing notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: u64,
}
