use thiserror::Error;

use super::CapitalCallStatus;

/// Errors raised by fund validation and the capital-call state machine.
///
/// All amounts are in cents.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FundError {
    #[error("Fund name cannot be empty")]
    EmptyName,
    #[error("Fund target size must be positive")]
    InvalidTargetSize,
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
    #[error("Allocation amount must be positive")]
    InvalidAmount,
    #[error("{0} cannot be negative")]
    NegativeValue(&'static str),
    #[error("{field} cannot exceed {max}")]
    AmountTooLarge { field: &'static str, max: i64 },
    #[error(
        "Allocation of {requested} exceeds fund capacity: {committed} of {target} already committed"
    )]
    ExceedsFundSize {
        target: i64,
        committed: i64,
        requested: i64,
    },
    #[error("Allocation amount {amount} is below the {called} already called")]
    AmountBelowCalled { amount: i64, called: i64 },
    #[error("Allocation is written off")]
    AllocationWrittenOff,
    #[error("Allocation is fully called")]
    FullyCalled,
    #[error("Capital call of {requested} exceeds the {available} left to call")]
    ExceedsUncalled { requested: i64, available: i64 },
    #[error("Invalid capital call amount: {0}")]
    InvalidCallAmount(String),
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("Invalid percentage: {0}")]
    InvalidPercentage(f64),
    #[error("Due date must not be before the call date")]
    DueBeforeCallDate,
    #[error("Payment amount must be positive")]
    NonPositivePayment,
    #[error("Payment of {amount} exceeds the outstanding {outstanding}")]
    Overpayment { amount: i64, outstanding: i64 },
    #[error("Cannot move capital call from {from} to {to}")]
    InvalidCallTransition {
        from: CapitalCallStatus,
        to: CapitalCallStatus,
    },
    #[error("Capital call has recorded payments")]
    CallHasPayments,
    #[error("Fund still has allocations")]
    FundHasAllocations,
}
