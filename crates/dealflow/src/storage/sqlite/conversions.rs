//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! These are testable in isolation without database access.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use dealflow_core::deal::{
    Deal, DealAssignment, DealStage, DealStar, MemoComment, MiniMemo, TimelineEvent,
    TimelineEventType,
};
use dealflow_core::document::{Document, DocumentType};
use dealflow_core::fund::{
    AllocationStatus, AmountType, CapitalCall, CapitalCallStatus, Fund, FundAllocation,
    FundStatus, SecurityType,
};
use dealflow_core::notification::{Notification, NotificationKind};
use dealflow_core::storage::RepositoryError;
use dealflow_core::user::{User, UserRole};

// ============================================================================
// User conversions
// ============================================================================

/// Convert a SQLite row to a User.
///
/// Expected columns: id, username, full_name, email, initials, avatar_color,
/// role, created_at, last_active
pub fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let last_active: Option<String> = row.get(8)?;

    Ok(User {
        id: parse_uuid(&id)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        initials: row.get(4)?,
        avatar_color: row.get(5)?,
        role: parse_enum(&role, UserRole::parse, "user role")?,
        created_at: parse_datetime(&created_at)?,
        last_active: last_active.as_deref().map(parse_datetime).transpose()?,
    })
}

// ============================================================================
// Deal conversions
// ============================================================================

/// Convert a SQLite row to a Deal.
///
/// Expected columns: id, name, description, sector, stage, round, target_raise,
/// valuation, lead_investor, contact_name, contact_email, website, tags,
/// rejection_reason, created_by, created_at, updated_at
pub fn row_to_deal(row: &Row) -> rusqlite::Result<Deal> {
    let id: String = row.get(0)?;
    let stage: String = row.get(4)?;
    let tags: String = row.get(12)?;
    let created_by: String = row.get(14)?;
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;

    Ok(Deal {
        id: parse_uuid(&id)?,
        name: row.get(1)?,
        description: row.get(2)?,
        sector: row.get(3)?,
        stage: parse_enum(&stage, DealStage::parse, "deal stage")?,
        round: row.get(5)?,
        target_raise: row.get(6)?,
        valuation: row.get(7)?,
        lead_investor: row.get(8)?,
        contact_name: row.get(9)?,
        contact_email: row.get(10)?,
        website: row.get(11)?,
        tags: parse_json(&tags)?,
        rejection_reason: row.get(13)?,
        created_by: parse_uuid(&created_by)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

/// Serialize deal tags to a JSON array string.
pub fn tags_to_json(tags: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(tags).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

/// Convert a SQLite row to a TimelineEvent.
///
/// Expected columns: id, deal_id, event_type, content, metadata, user_id, created_at
pub fn row_to_timeline_event(row: &Row) -> rusqlite::Result<TimelineEvent> {
    let id: String = row.get(0)?;
    let deal_id: String = row.get(1)?;
    let event_type: String = row.get(2)?;
    let metadata: String = row.get(4)?;
    let user_id: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(TimelineEvent {
        id: parse_uuid(&id)?,
        deal_id: parse_uuid(&deal_id)?,
        event_type: parse_enum(&event_type, TimelineEventType::parse, "timeline event type")?,
        content: row.get(3)?,
        metadata: parse_json(&metadata)?,
        user_id: user_id.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_datetime(&created_at)?,
    })
}

/// Serialize timeline metadata to a JSON string.
pub fn metadata_to_json(metadata: &serde_json::Value) -> Result<String, RepositoryError> {
    serde_json::to_string(metadata).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

/// Expected columns: deal_id, user_id, created_at
pub fn row_to_star(row: &Row) -> rusqlite::Result<DealStar> {
    let deal_id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let created_at: String = row.get(2)?;

    Ok(DealStar {
        deal_id: parse_uuid(&deal_id)?,
        user_id: parse_uuid(&user_id)?,
        created_at: parse_datetime(&created_at)?,
    })
}

/// Expected columns: id, deal_id, user_id, thesis, risks, value_creation,
/// score, created_at, updated_at
pub fn row_to_memo(row: &Row) -> rusqlite::Result<MiniMemo> {
    let id: String = row.get(0)?;
    let deal_id: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(MiniMemo {
        id: parse_uuid(&id)?,
        deal_id: parse_uuid(&deal_id)?,
        user_id: parse_uuid(&user_id)?,
        thesis: row.get(3)?,
        risks: row.get(4)?,
        value_creation: row.get(5)?,
        score: row.get(6)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

/// Expected columns: id, memo_id, user_id, content, created_at
pub fn row_to_comment(row: &Row) -> rusqlite::Result<MemoComment> {
    let id: String = row.get(0)?;
    let memo_id: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let created_at: String = row.get(4)?;

    Ok(MemoComment {
        id: parse_uuid(&id)?,
        memo_id: parse_uuid(&memo_id)?,
        user_id: parse_uuid(&user_id)?,
        content: row.get(3)?,
        created_at: parse_datetime(&created_at)?,
    })
}

/// Expected columns: deal_id, user_id, assigned_by, assigned_at
pub fn row_to_assignment(row: &Row) -> rusqlite::Result<DealAssignment> {
    let deal_id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let assigned_by: String = row.get(2)?;
    let assigned_at: String = row.get(3)?;

    Ok(DealAssignment {
        deal_id: parse_uuid(&deal_id)?,
        user_id: parse_uuid(&user_id)?,
        assigned_by: parse_uuid(&assigned_by)?,
        assigned_at: parse_datetime(&assigned_at)?,
    })
}

// ============================================================================
// Fund conversions
// ============================================================================

/// Convert a SQLite row to a Fund.
///
/// Expected columns: id, name, vintage, target_size, currency, status,
/// description, created_at, updated_at
pub fn row_to_fund(row: &Row) -> rusqlite::Result<Fund> {
    let id: String = row.get(0)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Fund {
        id: parse_uuid(&id)?,
        name: row.get(1)?,
        vintage: row.get(2)?,
        target_size: row.get(3)?,
        currency: row.get(4)?,
        status: parse_enum(&status, FundStatus::parse, "fund status")?,
        description: row.get(6)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

/// Convert a SQLite row to a FundAllocation.
///
/// Expected columns: id, fund_id, deal_id, amount, paid_amount, security_type,
/// allocation_date, status, portfolio_weight, market_value, total_returned,
/// notes, created_at, updated_at
pub fn row_to_allocation(row: &Row) -> rusqlite::Result<FundAllocation> {
    let id: String = row.get(0)?;
    let fund_id: String = row.get(1)?;
    let deal_id: String = row.get(2)?;
    let security_type: String = row.get(5)?;
    let allocation_date: String = row.get(6)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(FundAllocation {
        id: parse_uuid(&id)?,
        fund_id: parse_uuid(&fund_id)?,
        deal_id: parse_uuid(&deal_id)?,
        amount: row.get(3)?,
        paid_amount: row.get(4)?,
        security_type: parse_enum(&security_type, SecurityType::parse, "security type")?,
        allocation_date: parse_date(&allocation_date)?,
        status: parse_enum(&status, AllocationStatus::parse, "allocation status")?,
        portfolio_weight: row.get(8)?,
        market_value: row.get(9)?,
        total_returned: row.get(10)?,
        notes: row.get(11)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

/// Convert a SQLite row to a CapitalCall.
///
/// Expected columns: id, allocation_id, fund_id, call_number, call_date,
/// due_date, amount_type, call_percentage, call_amount, paid_amount,
/// paid_date, status, notes, created_at, updated_at
pub fn row_to_capital_call(row: &Row) -> rusqlite::Result<CapitalCall> {
    let id: String = row.get(0)?;
    let allocation_id: String = row.get(1)?;
    let fund_id: String = row.get(2)?;
    let call_date: String = row.get(4)?;
    let due_date: String = row.get(5)?;
    let amount_type: String = row.get(6)?;
    let paid_date: Option<String> = row.get(10)?;
    let status: String = row.get(11)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;

    Ok(CapitalCall {
        id: parse_uuid(&id)?,
        allocation_id: parse_uuid(&allocation_id)?,
        fund_id: parse_uuid(&fund_id)?,
        call_number: row.get(3)?,
        call_date: parse_date(&call_date)?,
        due_date: parse_date(&due_date)?,
        amount_type: parse_enum(&amount_type, AmountType::parse, "amount type")?,
        call_percentage: row.get(7)?,
        call_amount: row.get(8)?,
        paid_amount: row.get(9)?,
        paid_date: paid_date.as_deref().map(parse_date).transpose()?,
        status: parse_enum(&status, CapitalCallStatus::parse, "capital call status")?,
        notes: row.get(12)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

// ============================================================================
// Document and notification conversions
// ============================================================================

/// Expected columns: id, deal_id, file_name, content_type, size_bytes,
/// document_type, description, uploaded_by, uploaded_at
pub fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
    let id: String = row.get(0)?;
    let deal_id: String = row.get(1)?;
    let size_bytes: i64 = row.get(4)?;
    let document_type: String = row.get(5)?;
    let uploaded_by: String = row.get(7)?;
    let uploaded_at: String = row.get(8)?;

    Ok(Document {
        id: parse_uuid(&id)?,
        deal_id: parse_uuid(&deal_id)?,
        file_name: row.get(2)?,
        content_type: row.get(3)?,
        size_bytes: u64::try_from(size_bytes).map_err(conversion_error)?,
        document_type: parse_enum(&document_type, DocumentType::parse, "document type")?,
        description: row.get(6)?,
        uploaded_by: parse_uuid(&uploaded_by)?,
        uploaded_at: parse_datetime(&uploaded_at)?,
    })
}

/// Expected columns: id, user_id, kind, title, message, deal_id, read, created_at
pub fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let deal_id: Option<String> = row.get(5)?;
    let created_at: String = row.get(7)?;

    Ok(Notification {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        kind: parse_enum(&kind, NotificationKind::parse, "notification kind")?,
        title: row.get(3)?,
        message: row.get(4)?,
        deal_id: deal_id.as_deref().map(parse_uuid).transpose()?,
        read: row.get(6)?,
        created_at: parse_datetime(&created_at)?,
    })
}

// ============================================================================
// Helper functions
// ============================================================================

fn conversion_error<E>(e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

/// Parse a UUID from string.
fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(conversion_error)
}

/// Parse a date from ISO 8601 string (YYYY-MM-DD).
fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(conversion_error)
}

/// Parse a datetime from RFC 3339 string.
fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

fn parse_json<T: serde::de::DeserializeOwned>(s: &str) -> rusqlite::Result<T> {
    serde_json::from_str(s).map_err(conversion_error)
}

/// Parse a stored enum string with the type's own parser.
fn parse_enum<T>(s: &str, parse: fn(&str) -> Option<T>, what: &str) -> rusqlite::Result<T> {
    parse(s).ok_or_else(|| {
        conversion_error(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Unknown {what}: {s}"),
        ))
    })
}

/// Format a DateTime<Utc> for SQLite storage.
///
/// Always microsecond precision with a `Z` suffix so values sort as text.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Format a NaiveDate for SQLite storage (YYYY-MM-DD).
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
