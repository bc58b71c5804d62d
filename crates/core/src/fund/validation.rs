use super::error::FundError;
use super::requests::{CreateAllocationRequest, UpdateAllocationRequest};
use super::types::Fund;

/// Largest money value accepted from a client, in cents.
///
/// Keeps every sum over a fund's allocations and calls well inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000_000;

/// Reject amounts above [`MAX_AMOUNT_CENTS`].
pub fn check_amount_bound(field: &'static str, value: i64) -> Result<(), FundError> {
    if value > MAX_AMOUNT_CENTS {
        return Err(FundError::AmountTooLarge {
            field,
            max: MAX_AMOUNT_CENTS,
        });
    }
    Ok(())
}

/// Validate a fund before it is stored.
pub fn validate_fund(fund: &Fund) -> Result<(), FundError> {
    if fund.name.trim().is_empty() {
        return Err(FundError::EmptyName);
    }
    if let Some(size) = fund.target_size {
        if size <= 0 {
            return Err(FundError::InvalidTargetSize);
        }
        check_amount_bound("target_size", size)?;
    }
    validate_currency(&fund.currency)
}

/// Currencies are three uppercase ASCII letters.
pub fn validate_currency(currency: &str) -> Result<(), FundError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(FundError::InvalidCurrency(currency.to_string()))
    }
}

pub fn validate_create_allocation(request: &CreateAllocationRequest) -> Result<(), FundError> {
    if request.amount <= 0 {
        return Err(FundError::InvalidAmount);
    }
    check_amount_bound("amount", request.amount)?;
    if let Some(value) = request.market_value {
        if value < 0 {
            return Err(FundError::NegativeValue("market_value"));
        }
        check_amount_bound("market_value", value)?;
    }
    Ok(())
}

pub fn validate_update_allocation(request: &UpdateAllocationRequest) -> Result<(), FundError> {
    if let Some(amount) = request.amount {
        if amount <= 0 {
            return Err(FundError::InvalidAmount);
        }
        check_amount_bound("amount", amount)?;
    }
    for (field, value) in [
        ("market_value", request.market_value),
        ("total_returned", request.total_returned),
    ] {
        if let Some(value) = value {
            if value < 0 {
                return Err(FundError::NegativeValue(field));
            }
            check_amount_bound(field, value)?;
        }
    }
    Ok(())
}
