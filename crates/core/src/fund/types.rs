use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundStatus {
    Raising,
    Active,
    Closed,
}

impl FundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundStatus::Raising => "raising",
            FundStatus::Active => "active",
            FundStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "raising" => Some(FundStatus::Raising),
            "active" => Some(FundStatus::Active),
            "closed" => Some(FundStatus::Closed),
            _ => None,
        }
    }
}

/// An investment vehicle that commits capital to deals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fund {
    pub id: Uuid,
    pub name: String,
    pub vintage: Option<i32>,
    /// Maximum committed capital, in cents. `None` means uncapped.
    pub target_size: Option<i64>,
    /// ISO 4217 code.
    pub currency: String,
    pub status: FundStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fund {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            vintage: None,
            target_size: None,
            currency: "USD".to_string(),
            status: FundStatus::Active,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_target_size(mut self, cents: i64) -> Self {
        self.target_size = Some(cents);
        self
    }
}

/// Instrument an allocation is made through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityType {
    Equity,
    PreferredEquity,
    ConvertibleNote,
    Safe,
    Debt,
    Other,
}

impl SecurityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityType::Equity => "equity",
            SecurityType::PreferredEquity => "preferred_equity",
            SecurityType::ConvertibleNote => "convertible_note",
            SecurityType::Safe => "safe",
            SecurityType::Debt => "debt",
            SecurityType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "equity" => Some(SecurityType::Equity),
            "preferred_equity" => Some(SecurityType::PreferredEquity),
            "convertible_note" => Some(SecurityType::ConvertibleNote),
            "safe" => Some(SecurityType::Safe),
            "debt" => Some(SecurityType::Debt),
            "other" => Some(SecurityType::Other),
            _ => None,
        }
    }
}

/// Funding progress of an allocation.
///
/// `Committed`, `PartiallyPaid` and `Funded` are derived from the paid amount;
/// `WrittenOff` is set explicitly and never derived away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Committed,
    PartiallyPaid,
    Funded,
    WrittenOff,
}

impl AllocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::Committed => "committed",
            AllocationStatus::PartiallyPaid => "partially_paid",
            AllocationStatus::Funded => "funded",
            AllocationStatus::WrittenOff => "written_off",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "committed" => Some(AllocationStatus::Committed),
            "partially_paid" => Some(AllocationStatus::PartiallyPaid),
            "funded" => Some(AllocationStatus::Funded),
            "written_off" => Some(AllocationStatus::WrittenOff),
            _ => None,
        }
    }
}

/// A fund's commitment to a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundAllocation {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub deal_id: Uuid,
    /// Committed amount, in cents.
    pub amount: i64,
    /// Paid-in amount across capital calls, in cents.
    pub paid_amount: i64,
    pub security_type: SecurityType,
    pub allocation_date: NaiveDate,
    pub status: AllocationStatus,
    /// Share of the fund's committed capital, in percent.
    pub portfolio_weight: f64,
    /// Latest mark, in cents. Falls back to the paid amount when unset.
    pub market_value: Option<i64>,
    /// Distributions received, in cents.
    pub total_returned: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FundAllocation {
    pub fn new(fund_id: Uuid, deal_id: Uuid, amount: i64, allocation_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            fund_id,
            deal_id,
            amount,
            paid_amount: 0,
            security_type: SecurityType::Equity,
            allocation_date,
            status: AllocationStatus::Committed,
            portfolio_weight: 0.0,
            market_value: None,
            total_returned: 0,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_written_off(&self) -> bool {
        self.status == AllocationStatus::WrittenOff
    }
}

/// How a capital call amount was specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountType {
    Percentage,
    Amount,
}

impl AmountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmountType::Percentage => "percentage",
            AmountType::Amount => "amount",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(AmountType::Percentage),
            "amount" => Some(AmountType::Amount),
            _ => None,
        }
    }
}

/// State of a capital call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalCallStatus {
    Scheduled,
    Called,
    PartiallyPaid,
    Paid,
    Overdue,
    Defaulted,
}

impl CapitalCallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapitalCallStatus::Scheduled => "scheduled",
            CapitalCallStatus::Called => "called",
            CapitalCallStatus::PartiallyPaid => "partially_paid",
            CapitalCallStatus::Paid => "paid",
            CapitalCallStatus::Overdue => "overdue",
            CapitalCallStatus::Defaulted => "defaulted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(CapitalCallStatus::Scheduled),
            "called" => Some(CapitalCallStatus::Called),
            "partially_paid" => Some(CapitalCallStatus::PartiallyPaid),
            "paid" => Some(CapitalCallStatus::Paid),
            "overdue" => Some(CapitalCallStatus::Overdue),
            "defaulted" => Some(CapitalCallStatus::Defaulted),
            _ => None,
        }
    }
}

impl std::fmt::Display for CapitalCallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for part of an allocation's commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalCall {
    pub id: Uuid,
    pub allocation_id: Uuid,
    pub fund_id: Uuid,
    /// 1-based sequence within the allocation.
    pub call_number: u32,
    pub call_date: NaiveDate,
    pub due_date: NaiveDate,
    pub amount_type: AmountType,
    pub call_percentage: Option<f64>,
    /// Requested amount, in cents.
    pub call_amount: i64,
    pub paid_amount: i64,
    pub paid_date: Option<NaiveDate>,
    pub status: CapitalCallStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CapitalCall {
    pub fn new(
        allocation: &FundAllocation,
        call_number: u32,
        call_date: NaiveDate,
        due_date: NaiveDate,
        call_amount: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            allocation_id: allocation.id,
            fund_id: allocation.fund_id,
            call_number,
            call_date,
            due_date,
            amount_type: AmountType::Amount,
            call_percentage: None,
            call_amount,
            paid_amount: 0,
            paid_date: None,
            status: CapitalCallStatus::Scheduled,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Capital position of a fund, computed from its allocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSummary {
    pub committed_capital: i64,
    pub called_capital: i64,
    pub uncalled_capital: i64,
    pub total_returned: i64,
    pub aum: i64,
    pub allocation_count: usize,
    pub deal_count: usize,
    /// Called capital as a percentage of the target size.
    pub deployment_pct: Option<f64>,
    pub moic: Option<f64>,
}

/// A capital call as presented to clients, with derived fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapitalCallView {
    #[serde(flatten)]
    pub call: CapitalCall,
    pub outstanding: i64,
    /// Status after applying the calendar (`scheduled` calls whose date has
    /// passed read as `called`, unpaid calls past due read as `overdue`).
    pub effective_status: CapitalCallStatus,
}

/// The complete set of writes produced by one ledger operation.
///
/// Storage applies an update atomically: either every row changes or none do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerUpdate {
    pub upsert_allocations: Vec<FundAllocation>,
    pub upsert_capital_calls: Vec<CapitalCall>,
    pub delete_allocations: Vec<Uuid>,
    pub delete_capital_calls: Vec<Uuid>,
}

impl LedgerUpdate {
    pub fn is_empty(&self) -> bool {
        self.upsert_allocations.is_empty()
            && self.upsert_capital_calls.is_empty()
            && self.delete_allocations.is_empty()
            && self.delete_capital_calls.is_empty()
    }

    /// Fund IDs touched by this update, deduplicated.
    pub fn fund_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .upsert_allocations
            .iter()
            .map(|a| a.fund_id)
            .chain(self.upsert_capital_calls.iter().map(|c| c.fund_id))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            CapitalCallStatus::Scheduled,
            CapitalCallStatus::Called,
            CapitalCallStatus::PartiallyPaid,
            CapitalCallStatus::Paid,
            CapitalCallStatus::Overdue,
            CapitalCallStatus::Defaulted,
        ] {
            assert_eq!(CapitalCallStatus::parse(status.as_str()), Some(status));
        }
        for status in [
            AllocationStatus::Committed,
            AllocationStatus::PartiallyPaid,
            AllocationStatus::Funded,
            AllocationStatus::WrittenOff,
        ] {
            assert_eq!(AllocationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SecurityType::parse("safe"), Some(SecurityType::Safe));
        assert_eq!(FundStatus::parse("raising"), Some(FundStatus::Raising));
        assert_eq!(AmountType::parse("bogus"), None);
    }

    #[test]
    fn test_new_allocation_defaults() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let allocation = FundAllocation::new(Uuid::nil(), Uuid::nil(), 10_000, date);
        assert_eq!(allocation.status, AllocationStatus::Committed);
        assert_eq!(allocation.paid_amount, 0);
        assert_eq!(allocation.security_type, SecurityType::Equity);
    }

    #[test]
    fn test_ledger_update_fund_ids_dedup() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let fund = Uuid::new_v4();
        let allocation = FundAllocation::new(fund, Uuid::nil(), 100, date);
        let call = CapitalCall::new(&allocation, 1, date, date, 50);
        let update = LedgerUpdate {
            upsert_allocations: vec![allocation],
            upsert_capital_calls: vec![call],
            ..Default::default()
        };
        assert_eq!(update.fund_ids(), vec![fund]);
        assert!(!update.is_empty());
        assert!(LedgerUpdate::default().is_empty());
    }
}
