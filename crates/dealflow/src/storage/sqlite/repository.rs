//! SQLite repository implementation.
//!
//! Implements the repository traits from `dealflow_core::storage` using SQLite.

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use dealflow_core::deal::{Deal, DealAssignment, DealStar, MemoComment, MiniMemo, TimelineEvent};
use dealflow_core::document::Document;
use dealflow_core::fund::{CapitalCall, Fund, FundAllocation, LedgerUpdate};
use dealflow_core::notification::Notification;
use dealflow_core::storage::{
    AssignmentRepository, DealRepository, DocumentRepository, FundRepository, MemoRepository,
    NotificationRepository, RepositoryError, Result, StarRepository, TimelineRepository,
    UserRepository,
};
use dealflow_core::user::User;

use super::conversions::{
    format_date, format_datetime, metadata_to_json, row_to_allocation, row_to_assignment,
    row_to_capital_call, row_to_comment, row_to_deal, row_to_document, row_to_fund, row_to_memo,
    row_to_notification, row_to_star, row_to_timeline_event, row_to_user, tags_to_json,
};
use super::error::{map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// Turns "no row changed" into `QueryReturnedNoRows`, which maps to `NotFound`.
fn require_changed(rows: usize) -> tokio_rusqlite::Result<()> {
    if rows == 0 {
        Err(wrap_err(rusqlite::Error::QueryReturnedNoRows))
    } else {
        Ok(())
    }
}

type RowMapper<T> = fn(&Row) -> rusqlite::Result<T>;

/// SQLite-based repository implementation.
///
/// Provides async access to SQLite storage for all entity types. Foreign keys
/// are enforced, so child rows cascade with their deal and allocations block
/// deletion of their fund and deal.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Initialize the database schema.
    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }

    async fn fetch_optional<T>(
        &self,
        sql: &'static str,
        id: Uuid,
        map: RowMapper<T>,
        entity_type: &'static str,
    ) -> Result<Option<T>>
    where
        T: Send + 'static,
    {
        let id_str = id.to_string();
        self.conn
            .call(move |conn| {
                conn.query_row(sql, [&id_str], map)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, entity_type, id.to_string()))
    }

    async fn fetch_all<T>(
        &self,
        sql: &'static str,
        args: Vec<String>,
        map: RowMapper<T>,
        entity_type: &'static str,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(params_from_iter(args.iter()), map)
                    .map_err(wrap_err)?;

                let mut items = Vec::new();
                for row_result in rows {
                    items.push(row_result.map_err(wrap_err)?);
                }
                Ok(items)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, entity_type))
    }

    /// Executes a single statement and returns the number of changed rows.
    async fn execute(
        &self,
        sql: &'static str,
        args: Vec<String>,
        entity_type: &'static str,
        id: String,
    ) -> Result<usize> {
        self.conn
            .call(move |conn| {
                conn.execute(sql, params_from_iter(args.iter()))
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, entity_type, id))
    }

    async fn count(&self, sql: &'static str, id: Uuid, entity_type: &'static str) -> Result<i64> {
        let id_str = id.to_string();
        self.conn
            .call(move |conn| {
                conn.query_row(sql, [&id_str], |row| row.get(0))
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, entity_type, id.to_string()))
    }
}

// ============================================================================
// UserRepository implementation
// ============================================================================

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.fetch_optional(schema::SELECT_USER_BY_ID, id, row_to_user, "User")
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();
        self.conn
            .call(move |conn| {
                conn.query_row(schema::SELECT_USER_BY_USERNAME, [&username], row_to_user)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "User"))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.conn
            .call(move |conn| {
                conn.query_row(schema::SELECT_USER_BY_EMAIL, [&email], row_to_user)
                    .optional()
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "User"))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.fetch_all(schema::SELECT_USERS, Vec::new(), row_to_user, "User")
            .await
    }

    async fn create_user(&self, user: &User, password_hash: &str) -> Result<()> {
        let user = user.clone();
        let password_hash = password_hash.to_string();
        let username = user.username.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_USER,
                    params![
                        user.id.to_string(),
                        user.username,
                        user.full_name,
                        user.email,
                        user.initials,
                        user.avatar_color,
                        user.role.as_str(),
                        password_hash,
                        format_datetime(&user.created_at),
                        user.last_active.as_ref().map(format_datetime),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "User", username))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let user = user.clone();
        let user_id = user.id.to_string();

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(
                        schema::UPDATE_USER,
                        params![
                            user.id.to_string(),
                            user.username,
                            user.full_name,
                            user.email,
                            user.initials,
                            user.avatar_color,
                            user.role.as_str(),
                            user.last_active.as_ref().map(format_datetime),
                        ],
                    )
                    .map_err(wrap_err)?;
                require_changed(rows)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "User", user_id))
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                tx.execute(schema::DELETE_STARS_BY_USER, [&id_str])
                    .map_err(wrap_err)?;
                tx.execute(schema::DELETE_ASSIGNMENTS_BY_USER, [&id_str])
                    .map_err(wrap_err)?;
                tx.execute(schema::DELETE_NOTIFICATIONS_BY_USER, [&id_str])
                    .map_err(wrap_err)?;
                let rows = tx
                    .execute(schema::DELETE_USER, [&id_str])
                    .map_err(wrap_err)?;
                require_changed(rows)?;
                tx.commit().map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "User", id.to_string()))
    }

    async fn get_password_hash(&self, id: Uuid) -> Result<Option<String>> {
        self.fetch_optional(schema::SELECT_PASSWORD_HASH, id, |row| row.get(0), "User")
            .await
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let rows = self
            .execute(
                schema::UPDATE_PASSWORD_HASH,
                vec![id.to_string(), password_hash.to_string()],
                "User",
                id.to_string(),
            )
            .await?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: "User",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// DealRepository implementation
// ============================================================================

#[async_trait]
impl DealRepository for SqliteRepository {
    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>> {
        self.fetch_optional(schema::SELECT_DEAL_BY_ID, id, row_to_deal, "Deal")
            .await
    }

    async fn list_deals(&self) -> Result<Vec<Deal>> {
        self.fetch_all(schema::SELECT_DEALS, Vec::new(), row_to_deal, "Deal")
            .await
    }

    async fn create_deal(&self, deal: &Deal) -> Result<()> {
        let deal = deal.clone();
        let tags = tags_to_json(&deal.tags)?;
        let deal_id = deal.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_DEAL,
                    params![
                        deal.id.to_string(),
                        deal.name,
                        deal.description,
                        deal.sector,
                        deal.stage.as_str(),
                        deal.round,
                        deal.target_raise,
                        deal.valuation,
                        deal.lead_investor,
                        deal.contact_name,
                        deal.contact_email,
                        deal.website,
                        tags,
                        deal.rejection_reason,
                        deal.created_by.to_string(),
                        format_datetime(&deal.created_at),
                        format_datetime(&deal.updated_at),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Deal", deal_id))
    }

    async fn update_deal(&self, deal: &Deal) -> Result<()> {
        let deal = deal.clone();
        let tags = tags_to_json(&deal.tags)?;
        let deal_id = deal.id.to_string();

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(
                        schema::UPDATE_DEAL,
                        params![
                            deal.id.to_string(),
                            deal.name,
                            deal.description,
                            deal.sector,
                            deal.stage.as_str(),
                            deal.round,
                            deal.target_raise,
                            deal.valuation,
                            deal.lead_investor,
                            deal.contact_name,
                            deal.contact_email,
                            deal.website,
                            tags,
                            deal.rejection_reason,
                            format_datetime(&deal.updated_at),
                        ],
                    )
                    .map_err(wrap_err)?;
                require_changed(rows)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Deal", deal_id))
    }

    async fn delete_deal(&self, id: Uuid) -> Result<()> {
        if self
            .count(schema::COUNT_ALLOCATIONS_BY_DEAL, id, "Deal")
            .await?
            > 0
        {
            return Err(RepositoryError::InvalidData(format!(
                "Deal {id} still has allocations"
            )));
        }
        let rows = self
            .execute(schema::DELETE_DEAL, vec![id.to_string()], "Deal", id.to_string())
            .await?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: "Deal",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// TimelineRepository implementation
// ============================================================================

#[async_trait]
impl TimelineRepository for SqliteRepository {
    async fn add_timeline_event(&self, event: &TimelineEvent) -> Result<()> {
        let event = event.clone();
        let metadata = metadata_to_json(&event.metadata)?;
        let event_id = event.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_TIMELINE_EVENT,
                    params![
                        event.id.to_string(),
                        event.deal_id.to_string(),
                        event.event_type.as_str(),
                        event.content,
                        metadata,
                        event.user_id.map(|id| id.to_string()),
                        format_datetime(&event.created_at),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "TimelineEvent", event_id))
    }

    async fn list_timeline_events(&self, deal_id: Uuid) -> Result<Vec<TimelineEvent>> {
        self.fetch_all(
            schema::SELECT_TIMELINE_BY_DEAL,
            vec![deal_id.to_string()],
            row_to_timeline_event,
            "TimelineEvent",
        )
        .await
    }

    async fn list_recent_timeline_events(&self, limit: usize) -> Result<Vec<TimelineEvent>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_RECENT_TIMELINE)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map([limit], row_to_timeline_event)
                    .map_err(wrap_err)?;

                let mut events = Vec::new();
                for row_result in rows {
                    events.push(row_result.map_err(wrap_err)?);
                }
                Ok(events)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "TimelineEvent"))
    }
}

// ============================================================================
// StarRepository implementation
// ============================================================================

#[async_trait]
impl StarRepository for SqliteRepository {
    async fn add_star(&self, star: &DealStar) -> Result<()> {
        self.execute(
            schema::INSERT_STAR,
            vec![
                star.deal_id.to_string(),
                star.user_id.to_string(),
                format_datetime(&star.created_at),
            ],
            "DealStar",
            format!("{}:{}", star.deal_id, star.user_id),
        )
        .await
        .map(|_| ())
    }

    async fn remove_star(&self, deal_id: Uuid, user_id: Uuid) -> Result<bool> {
        let rows = self
            .execute(
                schema::DELETE_STAR,
                vec![deal_id.to_string(), user_id.to_string()],
                "DealStar",
                format!("{deal_id}:{user_id}"),
            )
            .await?;
        Ok(rows > 0)
    }

    async fn list_stars_for_deal(&self, deal_id: Uuid) -> Result<Vec<DealStar>> {
        self.fetch_all(
            schema::SELECT_STARS_BY_DEAL,
            vec![deal_id.to_string()],
            row_to_star,
            "DealStar",
        )
        .await
    }

    async fn list_stars_by_user(&self, user_id: Uuid) -> Result<Vec<DealStar>> {
        self.fetch_all(
            schema::SELECT_STARS_BY_USER,
            vec![user_id.to_string()],
            row_to_star,
            "DealStar",
        )
        .await
    }

    async fn list_all_stars(&self) -> Result<Vec<DealStar>> {
        self.fetch_all(schema::SELECT_ALL_STARS, Vec::new(), row_to_star, "DealStar")
            .await
    }
}

// ============================================================================
// MemoRepository implementation
// ============================================================================

#[async_trait]
impl MemoRepository for SqliteRepository {
    async fn get_memo(&self, id: Uuid) -> Result<Option<MiniMemo>> {
        self.fetch_optional(schema::SELECT_MEMO_BY_ID, id, row_to_memo, "MiniMemo")
            .await
    }

    async fn create_memo(&self, memo: &MiniMemo) -> Result<()> {
        let memo = memo.clone();
        let memo_id = memo.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_MEMO,
                    params![
                        memo.id.to_string(),
                        memo.deal_id.to_string(),
                        memo.user_id.to_string(),
                        memo.thesis,
                        memo.risks,
                        memo.value_creation,
                        memo.score,
                        format_datetime(&memo.created_at),
                        format_datetime(&memo.updated_at),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "MiniMemo", memo_id))
    }

    async fn update_memo(&self, memo: &MiniMemo) -> Result<()> {
        let memo = memo.clone();
        let memo_id = memo.id.to_string();

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(
                        schema::UPDATE_MEMO,
                        params![
                            memo.id.to_string(),
                            memo.thesis,
                            memo.risks,
                            memo.value_creation,
                            memo.score,
                            format_datetime(&memo.updated_at),
                        ],
                    )
                    .map_err(wrap_err)?;
                require_changed(rows)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "MiniMemo", memo_id))
    }

    async fn delete_memo(&self, id: Uuid) -> Result<()> {
        let rows = self
            .execute(schema::DELETE_MEMO, vec![id.to_string()], "MiniMemo", id.to_string())
            .await?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: "MiniMemo",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_memos_for_deal(&self, deal_id: Uuid) -> Result<Vec<MiniMemo>> {
        self.fetch_all(
            schema::SELECT_MEMOS_BY_DEAL,
            vec![deal_id.to_string()],
            row_to_memo,
            "MiniMemo",
        )
        .await
    }

    async fn list_all_memos(&self) -> Result<Vec<MiniMemo>> {
        self.fetch_all(schema::SELECT_ALL_MEMOS, Vec::new(), row_to_memo, "MiniMemo")
            .await
    }

    async fn add_comment(&self, comment: &MemoComment) -> Result<()> {
        self.execute(
            schema::INSERT_COMMENT,
            vec![
                comment.id.to_string(),
                comment.memo_id.to_string(),
                comment.user_id.to_string(),
                comment.content.clone(),
                format_datetime(&comment.created_at),
            ],
            "MemoComment",
            comment.id.to_string(),
        )
        .await
        .map(|_| ())
    }

    async fn list_comments(&self, memo_id: Uuid) -> Result<Vec<MemoComment>> {
        self.fetch_all(
            schema::SELECT_COMMENTS_BY_MEMO,
            vec![memo_id.to_string()],
            row_to_comment,
            "MemoComment",
        )
        .await
    }
}

// ============================================================================
// AssignmentRepository implementation
// ============================================================================

#[async_trait]
impl AssignmentRepository for SqliteRepository {
    async fn assign(&self, assignment: &DealAssignment) -> Result<()> {
        self.execute(
            schema::INSERT_ASSIGNMENT,
            vec![
                assignment.deal_id.to_string(),
                assignment.user_id.to_string(),
                assignment.assigned_by.to_string(),
                format_datetime(&assignment.assigned_at),
            ],
            "DealAssignment",
            format!("{}:{}", assignment.deal_id, assignment.user_id),
        )
        .await
        .map(|_| ())
    }

    async fn unassign(&self, deal_id: Uuid, user_id: Uuid) -> Result<bool> {
        let rows = self
            .execute(
                schema::DELETE_ASSIGNMENT,
                vec![deal_id.to_string(), user_id.to_string()],
                "DealAssignment",
                format!("{deal_id}:{user_id}"),
            )
            .await?;
        Ok(rows > 0)
    }

    async fn list_assignments_for_deal(&self, deal_id: Uuid) -> Result<Vec<DealAssignment>> {
        self.fetch_all(
            schema::SELECT_ASSIGNMENTS_BY_DEAL,
            vec![deal_id.to_string()],
            row_to_assignment,
            "DealAssignment",
        )
        .await
    }

    async fn list_assignments_for_user(&self, user_id: Uuid) -> Result<Vec<DealAssignment>> {
        self.fetch_all(
            schema::SELECT_ASSIGNMENTS_BY_USER,
            vec![user_id.to_string()],
            row_to_assignment,
            "DealAssignment",
        )
        .await
    }

    async fn list_all_assignments(&self) -> Result<Vec<DealAssignment>> {
        self.fetch_all(
            schema::SELECT_ALL_ASSIGNMENTS,
            Vec::new(),
            row_to_assignment,
            "DealAssignment",
        )
        .await
    }
}

// ============================================================================
// FundRepository implementation
// ============================================================================

fn upsert_allocation(tx: &rusqlite::Transaction<'_>, a: &FundAllocation) -> rusqlite::Result<usize> {
    tx.execute(
        schema::UPSERT_ALLOCATION,
        params![
            a.id.to_string(),
            a.fund_id.to_string(),
            a.deal_id.to_string(),
            a.amount,
            a.paid_amount,
            a.security_type.as_str(),
            format_date(&a.allocation_date),
            a.status.as_str(),
            a.portfolio_weight,
            a.market_value,
            a.total_returned,
            a.notes,
            format_datetime(&a.created_at),
            format_datetime(&a.updated_at),
        ],
    )
}

fn upsert_capital_call(tx: &rusqlite::Transaction<'_>, c: &CapitalCall) -> rusqlite::Result<usize> {
    tx.execute(
        schema::UPSERT_CAPITAL_CALL,
        params![
            c.id.to_string(),
            c.allocation_id.to_string(),
            c.fund_id.to_string(),
            c.call_number,
            format_date(&c.call_date),
            format_date(&c.due_date),
            c.amount_type.as_str(),
            c.call_percentage,
            c.call_amount,
            c.paid_amount,
            c.paid_date.as_ref().map(format_date),
            c.status.as_str(),
            c.notes,
            format_datetime(&c.created_at),
            format_datetime(&c.updated_at),
        ],
    )
}

#[async_trait]
impl FundRepository for SqliteRepository {
    async fn get_fund(&self, id: Uuid) -> Result<Option<Fund>> {
        self.fetch_optional(schema::SELECT_FUND_BY_ID, id, row_to_fund, "Fund")
            .await
    }

    async fn list_funds(&self) -> Result<Vec<Fund>> {
        self.fetch_all(schema::SELECT_FUNDS, Vec::new(), row_to_fund, "Fund")
            .await
    }

    async fn create_fund(&self, fund: &Fund) -> Result<()> {
        let fund = fund.clone();
        let fund_id = fund.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_FUND,
                    params![
                        fund.id.to_string(),
                        fund.name,
                        fund.vintage,
                        fund.target_size,
                        fund.currency,
                        fund.status.as_str(),
                        fund.description,
                        format_datetime(&fund.created_at),
                        format_datetime(&fund.updated_at),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Fund", fund_id))
    }

    async fn update_fund(&self, fund: &Fund) -> Result<()> {
        let fund = fund.clone();
        let fund_id = fund.id.to_string();

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(
                        schema::UPDATE_FUND,
                        params![
                            fund.id.to_string(),
                            fund.name,
                            fund.vintage,
                            fund.target_size,
                            fund.currency,
                            fund.status.as_str(),
                            fund.description,
                            format_datetime(&fund.updated_at),
                        ],
                    )
                    .map_err(wrap_err)?;
                require_changed(rows)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Fund", fund_id))
    }

    async fn delete_fund(&self, id: Uuid) -> Result<()> {
        if self
            .count(schema::COUNT_ALLOCATIONS_BY_FUND, id, "Fund")
            .await?
            > 0
        {
            return Err(RepositoryError::InvalidData(format!(
                "Fund {id} still has allocations"
            )));
        }
        let rows = self
            .execute(schema::DELETE_FUND, vec![id.to_string()], "Fund", id.to_string())
            .await?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: "Fund",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_allocation(&self, id: Uuid) -> Result<Option<FundAllocation>> {
        self.fetch_optional(
            schema::SELECT_ALLOCATION_BY_ID,
            id,
            row_to_allocation,
            "FundAllocation",
        )
        .await
    }

    async fn list_allocations_by_fund(&self, fund_id: Uuid) -> Result<Vec<FundAllocation>> {
        self.fetch_all(
            schema::SELECT_ALLOCATIONS_BY_FUND,
            vec![fund_id.to_string()],
            row_to_allocation,
            "FundAllocation",
        )
        .await
    }

    async fn list_allocations_by_deal(&self, deal_id: Uuid) -> Result<Vec<FundAllocation>> {
        self.fetch_all(
            schema::SELECT_ALLOCATIONS_BY_DEAL,
            vec![deal_id.to_string()],
            row_to_allocation,
            "FundAllocation",
        )
        .await
    }

    async fn list_all_allocations(&self) -> Result<Vec<FundAllocation>> {
        self.fetch_all(
            schema::SELECT_ALL_ALLOCATIONS,
            Vec::new(),
            row_to_allocation,
            "FundAllocation",
        )
        .await
    }

    async fn get_capital_call(&self, id: Uuid) -> Result<Option<CapitalCall>> {
        self.fetch_optional(
            schema::SELECT_CAPITAL_CALL_BY_ID,
            id,
            row_to_capital_call,
            "CapitalCall",
        )
        .await
    }

    async fn list_capital_calls_by_allocation(
        &self,
        allocation_id: Uuid,
    ) -> Result<Vec<CapitalCall>> {
        self.fetch_all(
            schema::SELECT_CAPITAL_CALLS_BY_ALLOCATION,
            vec![allocation_id.to_string()],
            row_to_capital_call,
            "CapitalCall",
        )
        .await
    }

    async fn list_capital_calls_by_fund(&self, fund_id: Uuid) -> Result<Vec<CapitalCall>> {
        self.fetch_all(
            schema::SELECT_CAPITAL_CALLS_BY_FUND,
            vec![fund_id.to_string()],
            row_to_capital_call,
            "CapitalCall",
        )
        .await
    }

    async fn list_all_capital_calls(&self) -> Result<Vec<CapitalCall>> {
        self.fetch_all(
            schema::SELECT_ALL_CAPITAL_CALLS,
            Vec::new(),
            row_to_capital_call,
            "CapitalCall",
        )
        .await
    }

    async fn apply_ledger_update(&self, update: &LedgerUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        let update = update.clone();

        self.conn
            .call(move |conn| {
                // Dropping the transaction on any error rolls everything back.
                let tx = conn.transaction().map_err(wrap_err)?;
                for id in &update.delete_capital_calls {
                    tx.execute(schema::DELETE_CAPITAL_CALL, [id.to_string()])
                        .map_err(wrap_err)?;
                }
                for id in &update.delete_allocations {
                    tx.execute(schema::DELETE_ALLOCATION, [id.to_string()])
                        .map_err(wrap_err)?;
                }
                for allocation in &update.upsert_allocations {
                    upsert_allocation(&tx, allocation).map_err(wrap_err)?;
                }
                for call in &update.upsert_capital_calls {
                    upsert_capital_call(&tx, call).map_err(wrap_err)?;
                }
                tx.commit().map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "FundAllocation"))
    }
}

// ============================================================================
// DocumentRepository implementation
// ============================================================================

#[async_trait]
impl DocumentRepository for SqliteRepository {
    async fn create_document(&self, document: &Document, content: &[u8]) -> Result<()> {
        let document = document.clone();
        let content = content.to_vec();
        let document_id = document.id.to_string();
        let size_bytes = i64::try_from(document.size_bytes)
            .map_err(|e| RepositoryError::InvalidData(e.to_string()))?;

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_DOCUMENT,
                    params![
                        document.id.to_string(),
                        document.deal_id.to_string(),
                        document.file_name,
                        document.content_type,
                        size_bytes,
                        document.document_type.as_str(),
                        document.description,
                        document.uploaded_by.to_string(),
                        format_datetime(&document.uploaded_at),
                        content,
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Document", document_id))
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        self.fetch_optional(schema::SELECT_DOCUMENT_BY_ID, id, row_to_document, "Document")
            .await
    }

    async fn get_document_content(&self, id: Uuid) -> Result<Option<Vec<u8>>> {
        self.fetch_optional(
            schema::SELECT_DOCUMENT_CONTENT,
            id,
            |row| row.get(0),
            "Document",
        )
        .await
    }

    async fn list_documents_for_deal(&self, deal_id: Uuid) -> Result<Vec<Document>> {
        self.fetch_all(
            schema::SELECT_DOCUMENTS_BY_DEAL,
            vec![deal_id.to_string()],
            row_to_document,
            "Document",
        )
        .await
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        let rows = self
            .execute(schema::DELETE_DOCUMENT, vec![id.to_string()], "Document", id.to_string())
            .await?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: "Document",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// NotificationRepository implementation
// ============================================================================

#[async_trait]
impl NotificationRepository for SqliteRepository {
    async fn create_notification(&self, notification: &Notification) -> Result<()> {
        let n = notification.clone();
        let notification_id = n.id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_NOTIFICATION,
                    params![
                        n.id.to_string(),
                        n.user_id.to_string(),
                        n.kind.as_str(),
                        n.title,
                        n.message,
                        n.deal_id.map(|id| id.to_string()),
                        n.read,
                        format_datetime(&n.created_at),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Notification", notification_id))
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let user_id = user_id.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_NOTIFICATIONS)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map(params![user_id, unread_only, limit], row_to_notification)
                    .map_err(wrap_err)?;

                let mut notifications = Vec::new();
                for row_result in rows {
                    notifications.push(row_result.map_err(wrap_err)?);
                }
                Ok(notifications)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Notification"))
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
        let count = self
            .count(schema::COUNT_UNREAD_NOTIFICATIONS, user_id, "Notification")
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let rows = self
            .execute(
                schema::MARK_NOTIFICATION_READ,
                vec![id.to_string(), user_id.to_string()],
                "Notification",
                id.to_string(),
            )
            .await?;
        Ok(rows > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let rows = self
            .execute(
                schema::MARK_ALL_NOTIFICATIONS_READ,
                vec![user_id.to_string()],
                "Notification",
                user_id.to_string(),
            )
            .await?;
        Ok(rows as u64)
    }

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let rows = self
            .execute(
                schema::DELETE_NOTIFICATION,
                vec![id.to_string(), user_id.to_string()],
                "Notification",
                id.to_string(),
            )
            .await?;
        Ok(rows > 0)
    }
}
