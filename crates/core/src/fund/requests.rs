//! API request types for funds, allocations and capital calls.
//!
//! Monetary fields are integer cents.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{CapitalCallStatus, Fund, FundStatus, SecurityType};
use crate::serde::{deserialize_optional_date, deserialize_optional_string};

/// Request payload for creating a fund.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFundRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vintage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FundStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
}

impl CreateFundRequest {
    pub fn into_fund(self) -> Fund {
        let mut fund = Fund::new(self.name.trim());
        fund.vintage = self.vintage;
        fund.target_size = self.target_size;
        if let Some(currency) = self.currency {
            fund.currency = currency.trim().to_uppercase();
        }
        if let Some(status) = self.status {
            fund.status = status;
        }
        fund.description = self.description;
        fund
    }
}

/// Request payload for updating a fund.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFundRequest {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vintage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FundStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
}

impl UpdateFundRequest {
    pub fn apply_to(self, fund: &mut Fund) {
        if let Some(name) = self.name {
            fund.name = name.trim().to_string();
        }
        if let Some(vintage) = self.vintage {
            fund.vintage = Some(vintage);
        }
        if let Some(target_size) = self.target_size {
            fund.target_size = Some(target_size);
        }
        if let Some(currency) = self.currency {
            fund.currency = currency.trim().to_uppercase();
        }
        if let Some(status) = self.status {
            fund.status = status;
        }
        if let Some(description) = self.description {
            fund.description = Some(description);
        }
        fund.updated_at = Utc::now();
    }

    /// True when the update can change capacity checks.
    pub fn changes_target_size(&self) -> bool {
        self.target_size.is_some()
    }
}

/// Request payload for committing a fund to a deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAllocationRequest {
    pub fund_id: Uuid,
    pub deal_id: Uuid,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_type: Option<SecurityType>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub allocation_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_value: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub notes: Option<String>,
}

/// Request payload for updating an allocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAllocationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_type: Option<SecurityType>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub allocation_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_returned: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub notes: Option<String>,
    /// `true` writes the allocation off, `false` reinstates it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written_off: Option<bool>,
}

/// Request payload for a single capital call.
///
/// Exactly one of `call_amount` (cents) and `call_percentage` (of the
/// allocation's commitment) must be set. `due_date` wins over `due_in_days`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCapitalCallRequest {
    pub call_date: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_in_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_percentage: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub notes: Option<String>,
}

/// Cadence of generated capital calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallFrequency {
    Single,
    Monthly,
    Quarterly,
    Biannual,
    Annual,
    Custom,
}

impl CallFrequency {
    /// Months between consecutive calls, `None` for custom schedules.
    pub fn months(&self) -> Option<u32> {
        match self {
            CallFrequency::Single => Some(0),
            CallFrequency::Monthly => Some(1),
            CallFrequency::Quarterly => Some(3),
            CallFrequency::Biannual => Some(6),
            CallFrequency::Annual => Some(12),
            CallFrequency::Custom => None,
        }
    }
}

/// One entry of a custom schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub call_date: NaiveDate,
    /// Percent of the remaining uncalled commitment.
    pub percentage: f64,
}

/// Request payload for generating a series of capital calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCallsRequest {
    pub frequency: CallFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_count: Option<u32>,
    #[serde(default)]
    pub installments: Vec<Installment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_in_days: Option<u32>,
    /// Drop unpaid calls that are still `scheduled` before generating.
    #[serde(default)]
    pub replace_scheduled: bool,
}

impl ScheduleCallsRequest {
    /// A periodic schedule starting on `start_date`.
    pub fn periodic(frequency: CallFrequency, start_date: NaiveDate, call_count: u32) -> Self {
        Self {
            frequency,
            start_date: Some(start_date),
            call_count: Some(call_count),
            installments: Vec::new(),
            due_in_days: None,
            replace_scheduled: false,
        }
    }

    /// A custom schedule from explicit installments.
    pub fn custom(installments: Vec<Installment>) -> Self {
        Self {
            frequency: CallFrequency::Custom,
            start_date: None,
            call_count: None,
            installments,
            due_in_days: None,
            replace_scheduled: false,
        }
    }
}

/// Request payload for recording money received against a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: i64,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub paid_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCallStatusRequest {
    pub status: CapitalCallStatus,
}

/// Query parameters for listing capital calls across funds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapitalCallQuery {
    /// Matches the effective status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CapitalCallStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fund_request_normalizes_currency() {
        let request: CreateFundRequest =
            serde_json::from_str(r#"{"name": " Fund I ", "currency": "eur", "target_size": 100}"#)
                .unwrap();
        let fund = request.into_fund();
        assert_eq!(fund.name, "Fund I");
        assert_eq!(fund.currency, "EUR");
        assert_eq!(fund.target_size, Some(100));
        assert_eq!(fund.status, FundStatus::Active);
    }

    #[test]
    fn test_update_fund_request_keeps_absent_fields() {
        let mut fund = Fund::new("Fund I").with_target_size(1_000);
        let update = UpdateFundRequest {
            status: Some(FundStatus::Closed),
            ..Default::default()
        };
        assert!(!update.changes_target_size());
        update.apply_to(&mut fund);
        assert_eq!(fund.status, FundStatus::Closed);
        assert_eq!(fund.target_size, Some(1_000));
        assert_eq!(fund.name, "Fund I");
    }

    #[test]
    fn test_schedule_request_deserializes_custom_installments() {
        let request: ScheduleCallsRequest = serde_json::from_str(
            r#"{
                "frequency": "custom",
                "installments": [
                    {"call_date": "2024-01-15", "percentage": 40},
                    {"call_date": "2024-06-15", "percentage": 60}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(request.frequency, CallFrequency::Custom);
        assert_eq!(request.installments.len(), 2);
        assert_eq!(request.installments[0].percentage, 40.0);
        assert!(!request.replace_scheduled);
    }

    #[test]
    fn test_frequency_months() {
        assert_eq!(CallFrequency::Quarterly.months(), Some(3));
        assert_eq!(CallFrequency::Custom.months(), None);
    }
}
