//! Pure functions for serializing domain types to and from cache bytes.
//!
//! Cache values are JSON so they stay readable when inspected.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serializes any cacheable value to JSON bytes.
pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes produced by [`serialize`].
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{Deal, DealStage};
    use crate::fund::{Fund, FundAllocation};
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_deal_survives_cache_encoding() {
        let mut deal = Deal::new("Acme Robotics", Uuid::nil())
            .with_sector("Robotics")
            .with_stage(DealStage::Diligence)
            .with_tags(vec!["series-a".to_string()]);
        deal.created_at = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        deal.target_raise = Some(1_500_000_000);

        let bytes = serialize(&deal).unwrap();
        let decoded: Deal = deserialize(&bytes).unwrap();
        assert_eq!(decoded, deal);
    }

    #[test]
    fn test_allocation_list_encoding() {
        let fund = Fund::new("Fund I");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let allocations = vec![
            FundAllocation::new(fund.id, Uuid::new_v4(), 1_000, date),
            FundAllocation::new(fund.id, Uuid::new_v4(), 2_000, date),
        ];
        let bytes = serialize(allocations.as_slice()).unwrap();
        let decoded: Vec<FundAllocation> = deserialize(&bytes).unwrap();
        assert_eq!(decoded, allocations);
    }

    #[test]
    fn test_deserialize_garbage_fails() {
        let result: Result<Fund> = deserialize(b"not json");
        assert!(matches!(result, Err(SerializationError::DeserializeFailed(_))));
    }

    #[test]
    fn test_deserialize_wrong_shape_fails() {
        let bytes = serialize(&vec![1, 2, 3]).unwrap();
        let result: Result<Deal> = deserialize(&bytes);
        assert!(result.is_err());
    }
}
