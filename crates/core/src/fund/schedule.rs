//! Capital call generation.

use chrono::{Days, Months, NaiveDate};
use uuid::Uuid;

use super::error::FundError;
use super::ledger::percent_to_cents;
use super::requests::{CallFrequency, CreateCapitalCallRequest, ScheduleCallsRequest};
use super::types::{AmountType, CapitalCall, CapitalCallStatus, FundAllocation};
use super::validation::check_amount_bound;

pub const DEFAULT_DUE_IN_DAYS: u32 = 30;
pub const MAX_DUE_IN_DAYS: u32 = 365;
pub const MAX_CALL_COUNT: u32 = 120;

/// Calls to insert and calls to delete for one scheduling request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulePlan {
    pub new_calls: Vec<CapitalCall>,
    pub removed: Vec<Uuid>,
}

fn due_date_for(call_date: NaiveDate, due_in_days: Option<u32>) -> Result<NaiveDate, FundError> {
    let days = due_in_days.unwrap_or(DEFAULT_DUE_IN_DAYS);
    if days > MAX_DUE_IN_DAYS {
        return Err(FundError::InvalidSchedule(format!(
            "due_in_days must be at most {MAX_DUE_IN_DAYS}"
        )));
    }
    call_date
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| FundError::InvalidSchedule("due date out of range".to_string()))
}

fn initial_status(call_date: NaiveDate, today: NaiveDate) -> CapitalCallStatus {
    if call_date <= today {
        CapitalCallStatus::Called
    } else {
        CapitalCallStatus::Scheduled
    }
}

fn next_call_number(calls: &[&CapitalCall]) -> u32 {
    calls.iter().map(|c| c.call_number).max().unwrap_or(0) + 1
}

fn validate_percentage(pct: f64) -> Result<(), FundError> {
    if pct.is_finite() && pct > 0.0 && pct <= 100.0 {
        Ok(())
    } else {
        Err(FundError::InvalidPercentage(pct))
    }
}

/// Split `base` into `count` equal parts; the last absorbs the remainder.
fn split_evenly(base: i64, count: u32) -> Result<Vec<i64>, FundError> {
    let each = base / i64::from(count);
    if each == 0 {
        return Err(FundError::InvalidSchedule(format!(
            "{base} cannot be split into {count} calls"
        )));
    }
    let mut amounts = vec![each; count as usize];
    if let Some(last) = amounts.last_mut() {
        *last += base - each * i64::from(count);
    }
    Ok(amounts)
}

/// Generate capital calls for the uncalled part of an allocation.
///
/// `existing` may contain calls of other allocations; they are ignored.
pub fn generate_capital_calls(
    allocation: &FundAllocation,
    existing: &[CapitalCall],
    request: &ScheduleCallsRequest,
    today: NaiveDate,
) -> Result<SchedulePlan, FundError> {
    if allocation.is_written_off() {
        return Err(FundError::AllocationWrittenOff);
    }

    let own: Vec<&CapitalCall> = existing
        .iter()
        .filter(|c| c.allocation_id == allocation.id)
        .collect();
    let (dropped, kept): (Vec<&CapitalCall>, Vec<&CapitalCall>) =
        own.into_iter().partition(|c| {
            request.replace_scheduled
                && c.status == CapitalCallStatus::Scheduled
                && c.paid_amount == 0
        });

    let base = allocation.amount - kept.iter().map(|c| c.call_amount).sum::<i64>();
    if base <= 0 {
        return Err(FundError::FullyCalled);
    }

    let planned: Vec<(NaiveDate, i64, Option<f64>)> = match request.frequency.months() {
        Some(step) => {
            let count = match request.frequency {
                CallFrequency::Single => 1,
                _ => request.call_count.unwrap_or(1),
            };
            if count == 0 || count > MAX_CALL_COUNT {
                return Err(FundError::InvalidSchedule(format!(
                    "call_count must be between 1 and {MAX_CALL_COUNT}"
                )));
            }
            let start = request.start_date.unwrap_or(today);
            let amounts = split_evenly(base, count)?;
            amounts
                .into_iter()
                .enumerate()
                .map(|(i, amount)| {
                    start
                        .checked_add_months(Months::new(step * i as u32))
                        .map(|date| (date, amount, None))
                        .ok_or_else(|| FundError::InvalidSchedule("date out of range".to_string()))
                })
                .collect::<Result<_, _>>()?
        }
        None => plan_installments(base, request)?,
    };

    let mut number = next_call_number(&kept);
    let mut new_calls = Vec::with_capacity(planned.len());
    for (call_date, amount, percentage) in planned {
        let due_date = due_date_for(call_date, request.due_in_days)?;
        let mut call = CapitalCall::new(allocation, number, call_date, due_date, amount);
        call.status = initial_status(call_date, today);
        if let Some(pct) = percentage {
            call.amount_type = AmountType::Percentage;
            call.call_percentage = Some(pct);
        }
        new_calls.push(call);
        number += 1;
    }

    Ok(SchedulePlan {
        new_calls,
        removed: dropped.into_iter().map(|c| c.id).collect(),
    })
}

fn plan_installments(
    base: i64,
    request: &ScheduleCallsRequest,
) -> Result<Vec<(NaiveDate, i64, Option<f64>)>, FundError> {
    if request.installments.is_empty() {
        return Err(FundError::InvalidSchedule(
            "custom schedules need at least one installment".to_string(),
        ));
    }
    if request.installments.len() > MAX_CALL_COUNT as usize {
        return Err(FundError::InvalidSchedule(format!(
            "at most {MAX_CALL_COUNT} installments"
        )));
    }
    for installment in &request.installments {
        validate_percentage(installment.percentage)?;
    }
    let total_pct: f64 = request.installments.iter().map(|i| i.percentage).sum();
    if total_pct > 100.0 + 1e-9 {
        return Err(FundError::InvalidPercentage(total_pct));
    }

    let mut installments = request.installments.clone();
    installments.sort_by_key(|i| i.call_date);

    let mut planned: Vec<(NaiveDate, i64, Option<f64>)> = installments
        .iter()
        .map(|i| (i.call_date, percent_to_cents(base, i.percentage), Some(i.percentage)))
        .collect();

    let total: i64 = planned.iter().map(|(_, amount, _)| amount).sum();
    if (total_pct - 100.0).abs() < 1e-9 {
        if let Some(last) = planned.last_mut() {
            last.1 += base - total;
        }
    } else if total > base {
        return Err(FundError::ExceedsUncalled {
            requested: total,
            available: base,
        });
    }

    if planned.iter().any(|(_, amount, _)| *amount <= 0) {
        return Err(FundError::InvalidSchedule(
            "an installment rounds to zero".to_string(),
        ));
    }
    Ok(planned)
}

/// Build one capital call from a percentage of the commitment or an amount.
pub fn new_capital_call(
    allocation: &FundAllocation,
    existing: &[CapitalCall],
    request: &CreateCapitalCallRequest,
    today: NaiveDate,
) -> Result<CapitalCall, FundError> {
    if allocation.is_written_off() {
        return Err(FundError::AllocationWrittenOff);
    }

    let (amount, percentage) = match (request.call_amount, request.call_percentage) {
        (Some(amount), None) => (amount, None),
        (None, Some(pct)) => {
            validate_percentage(pct)?;
            (percent_to_cents(allocation.amount, pct), Some(pct))
        }
        _ => {
            return Err(FundError::InvalidCallAmount(
                "set exactly one of call_amount and call_percentage".to_string(),
            ))
        }
    };
    if amount <= 0 {
        return Err(FundError::InvalidCallAmount(
            "amount must be positive".to_string(),
        ));
    }
    check_amount_bound("call_amount", amount)?;

    let own: Vec<&CapitalCall> = existing
        .iter()
        .filter(|c| c.allocation_id == allocation.id)
        .collect();
    let available = allocation.amount - own.iter().map(|c| c.call_amount).sum::<i64>();
    if available <= 0 {
        return Err(FundError::FullyCalled);
    }
    if amount > available {
        return Err(FundError::ExceedsUncalled {
            requested: amount,
            available,
        });
    }

    let due_date = match request.due_date {
        Some(due) if due < request.call_date => return Err(FundError::DueBeforeCallDate),
        Some(due) => due,
        None => due_date_for(request.call_date, request.due_in_days)?,
    };

    let mut call = CapitalCall::new(
        allocation,
        next_call_number(&own),
        request.call_date,
        due_date,
        amount,
    );
    call.status = initial_status(request.call_date, today);
    call.notes = request.notes.clone();
    if let Some(pct) = percentage {
        call.amount_type = AmountType::Percentage;
        call.call_percentage = Some(pct);
    }
    Ok(call)
}
