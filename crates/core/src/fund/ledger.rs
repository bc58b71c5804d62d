//! Capital arithmetic over allocations and capital calls.
//!
//! Everything here is pure: callers load rows, run these functions and
//! persist the result as one [`LedgerUpdate`](super::LedgerUpdate).

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::error::FundError;
use super::types::{
    AllocationStatus, CapitalCall, CapitalCallStatus, CapitalCallView, Fund, FundAllocation,
    FundSummary,
};
use super::validation::check_amount_bound;

/// Convert a percentage of `base` to cents, rounding half away from zero.
pub fn percent_to_cents(base: i64, pct: f64) -> i64 {
    (base as f64 * pct / 100.0).round() as i64
}

fn saturating_sum(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0, i64::saturating_add)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Amount still owed on a call.
pub fn outstanding(call: &CapitalCall) -> i64 {
    (call.call_amount - call.paid_amount).max(0)
}

/// Derive an allocation's status from how much has been paid in.
///
/// `WrittenOff` is never replaced.
pub fn derive_allocation_status(
    amount: i64,
    paid: i64,
    current: AllocationStatus,
) -> AllocationStatus {
    if current == AllocationStatus::WrittenOff {
        AllocationStatus::WrittenOff
    } else if paid <= 0 {
        AllocationStatus::Committed
    } else if paid < amount {
        AllocationStatus::PartiallyPaid
    } else {
        AllocationStatus::Funded
    }
}

/// Recompute an allocation's paid amount from its calls.
///
/// Calls belonging to other allocations are ignored.
pub fn rollup_allocation(
    allocation: &mut FundAllocation,
    calls: &[CapitalCall],
    now: DateTime<Utc>,
) {
    let paid: i64 = calls
        .iter()
        .filter(|c| c.allocation_id == allocation.id)
        .map(|c| c.paid_amount)
        .sum();
    allocation.paid_amount = paid;
    allocation.status = derive_allocation_status(allocation.amount, paid, allocation.status);
    allocation.updated_at = now;
}

/// Compute the capital position of a fund.
pub fn summarize_fund(fund: &Fund, allocations: &[FundAllocation]) -> FundSummary {
    let live: Vec<&FundAllocation> = allocations
        .iter()
        .filter(|a| a.fund_id == fund.id && !a.is_written_off())
        .collect();

    let committed_capital = saturating_sum(live.iter().map(|a| a.amount));
    let called_capital = saturating_sum(live.iter().map(|a| a.paid_amount.min(a.amount)));
    let aum = saturating_sum(live.iter().map(|a| a.market_value.unwrap_or(a.paid_amount)));

    let own: Vec<&FundAllocation> = allocations.iter().filter(|a| a.fund_id == fund.id).collect();
    let total_returned = saturating_sum(own.iter().map(|a| a.total_returned));
    let total_paid = saturating_sum(own.iter().map(|a| a.paid_amount));
    let deal_count = own.iter().map(|a| a.deal_id).collect::<HashSet<_>>().len();

    let deployment_pct = match fund.target_size {
        Some(target) if target > 0 => {
            Some(round_to(called_capital as f64 / target as f64 * 100.0, 2))
        }
        _ => None,
    };
    let moic = (total_paid > 0).then(|| {
        round_to(
            aum.saturating_add(total_returned) as f64 / total_paid as f64,
            4,
        )
    });

    FundSummary {
        committed_capital,
        called_capital,
        uncalled_capital: committed_capital.saturating_sub(called_capital),
        total_returned,
        aum,
        allocation_count: own.len(),
        deal_count,
        deployment_pct,
        moic,
    }
}

/// Recompute every allocation's share of the fund's committed capital.
pub fn recalculate_portfolio_weights(allocations: &mut [FundAllocation]) {
    let total = saturating_sum(
        allocations
            .iter()
            .filter(|a| !a.is_written_off())
            .map(|a| a.amount),
    );

    for allocation in allocations.iter_mut() {
        allocation.portfolio_weight = if total <= 0 || allocation.is_written_off() {
            0.0
        } else {
            round_to(allocation.amount as f64 / total as f64 * 100.0, 4)
        };
    }
}

/// Check that committing `new_amount` keeps the fund within its target size.
///
/// `replacing` names an allocation whose current amount is superseded by
/// `new_amount` (an update rather than a new commitment).
pub fn check_fund_capacity(
    fund: &Fund,
    allocations: &[FundAllocation],
    new_amount: i64,
    replacing: Option<Uuid>,
) -> Result<(), FundError> {
    let Some(target) = fund.target_size else {
        return Ok(());
    };
    let committed: i64 = allocations
        .iter()
        .filter(|a| a.fund_id == fund.id && !a.is_written_off() && Some(a.id) != replacing)
        .map(|a| a.amount)
        .sum();
    let exceeds = committed
        .checked_add(new_amount)
        .is_none_or(|total| total > target);
    if exceeds {
        return Err(FundError::ExceedsFundSize {
            target,
            committed,
            requested: new_amount,
        });
    }
    Ok(())
}

/// Multiple on invested capital for one allocation.
pub fn allocation_moic(allocation: &FundAllocation) -> Option<f64> {
    if allocation.paid_amount <= 0 {
        return None;
    }
    let value =
        allocation.market_value.unwrap_or(allocation.paid_amount) + allocation.total_returned;
    Some(round_to(value as f64 / allocation.paid_amount as f64, 4))
}

/// Record money received against a call.
pub fn apply_payment(
    call: &mut CapitalCall,
    amount: i64,
    paid_date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<(), FundError> {
    if amount <= 0 {
        return Err(FundError::NonPositivePayment);
    }
    check_amount_bound("amount", amount)?;
    if call.status == CapitalCallStatus::Defaulted {
        return Err(FundError::InvalidCallTransition {
            from: call.status,
            to: CapitalCallStatus::Paid,
        });
    }
    let remaining = outstanding(call);
    if amount > remaining {
        return Err(FundError::Overpayment {
            amount,
            outstanding: remaining,
        });
    }

    call.paid_amount += amount;
    call.paid_date = Some(paid_date);
    call.status = if call.paid_amount >= call.call_amount {
        CapitalCallStatus::Paid
    } else {
        CapitalCallStatus::PartiallyPaid
    };
    call.updated_at = now;
    Ok(())
}

fn is_allowed_transition(from: CapitalCallStatus, to: CapitalCallStatus) -> bool {
    use CapitalCallStatus::*;
    matches!(
        (from, to),
        (Scheduled, Called)
            | (Scheduled, Defaulted)
            | (Called, Defaulted)
            | (PartiallyPaid, Defaulted)
            | (Overdue, Defaulted)
            | (Called, Overdue)
            | (PartiallyPaid, Overdue)
            | (Defaulted, Called)
    )
}

/// Move a call to `to` by hand. Payment states are reached only through
/// [`apply_payment`].
pub fn transition_call_status(
    call: &mut CapitalCall,
    to: CapitalCallStatus,
    now: DateTime<Utc>,
) -> Result<(), FundError> {
    if !is_allowed_transition(call.status, to) {
        return Err(FundError::InvalidCallTransition {
            from: call.status,
            to,
        });
    }
    call.status = if to == CapitalCallStatus::Called && call.paid_amount > 0 {
        CapitalCallStatus::PartiallyPaid
    } else {
        to
    };
    call.updated_at = now;
    Ok(())
}

/// Status of a call once the calendar is taken into account.
pub fn effective_call_status(call: &CapitalCall, today: NaiveDate) -> CapitalCallStatus {
    match call.status {
        CapitalCallStatus::Scheduled if call.call_date <= today => {
            if call.due_date < today {
                CapitalCallStatus::Overdue
            } else {
                CapitalCallStatus::Called
            }
        }
        CapitalCallStatus::Called | CapitalCallStatus::PartiallyPaid if call.due_date < today => {
            CapitalCallStatus::Overdue
        }
        status => status,
    }
}

pub fn call_view(call: CapitalCall, today: NaiveDate) -> CapitalCallView {
    CapitalCallView {
        outstanding: outstanding(&call),
        effective_status: effective_call_status(&call, today),
        call,
    }
}
