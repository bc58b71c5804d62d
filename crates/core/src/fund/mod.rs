mod error;
mod ledger;
mod requests;
mod schedule;
mod types;
mod validation;

pub use error::FundError;
pub use ledger::{
    allocation_moic, apply_payment, call_view, check_fund_capacity, derive_allocation_status,
    effective_call_status, outstanding, percent_to_cents, recalculate_portfolio_weights,
    rollup_allocation, summarize_fund, transition_call_status,
};
pub use requests::{
    CallFrequency, CapitalCallQuery, CreateAllocationRequest, CreateCapitalCallRequest,
    CreateFundRequest, Installment, RecordPaymentRequest, ScheduleCallsRequest,
    UpdateAllocationRequest, UpdateCallStatusRequest, UpdateFundRequest,
};
pub use schedule::{
    generate_capital_calls, new_capital_call, SchedulePlan, DEFAULT_DUE_IN_DAYS, MAX_CALL_COUNT,
    MAX_DUE_IN_DAYS,
};
pub use types::{
    AllocationStatus, AmountType, CapitalCall, CapitalCallStatus, CapitalCallView, Fund,
    FundAllocation, FundStatus, FundSummary, LedgerUpdate, SecurityType,
};
pub use validation::{
    check_amount_bound, validate_create_allocation, validate_currency, validate_fund,
    validate_update_allocation, MAX_AMOUNT_CENTS,
};
