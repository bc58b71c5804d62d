use uuid::Uuid;

/// Returns the cache key for a single deal.
pub fn deal_key(deal_id: Uuid) -> String {
    format!("deal:{}", deal_id)
}

/// Returns the cache key for a fund.
pub fn fund_key(fund_id: Uuid) -> String {
    format!("fund:{}", fund_id)
}

/// Returns the cache key for the allocations of a fund.
pub fn fund_allocations_key(fund_id: Uuid) -> String {
    format!("fund:{}:allocations", fund_id)
}

/// Returns the pattern matching every derived key of a fund.
///
/// The fund's own metadata key (`fund:{id}`) is not matched.
pub fn fund_pattern(fund_id: Uuid) -> String {
    format!("fund:{}:*", fund_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_uuid() -> Uuid {
        Uuid::nil()
    }

    #[test]
    fn test_deal_key() {
        assert_eq!(
            deal_key(test_uuid()),
            "deal:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_fund_keys() {
        assert_eq!(
            fund_key(test_uuid()),
            "fund:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            fund_allocations_key(test_uuid()),
            "fund:00000000-0000-0000-0000-000000000000:allocations"
        );
        assert_eq!(
            fund_pattern(test_uuid()),
            "fund:00000000-0000-0000-0000-000000000000:*"
        );
    }
}
