use async_trait::async_trait;
use uuid::Uuid;

use crate::deal::{Deal, DealAssignment, DealStar, MemoComment, MiniMemo, TimelineEvent};
use crate::document::Document;
use crate::fund::{CapitalCall, Fund, FundAllocation, LedgerUpdate};
use crate::notification::Notification;
use crate::user::User;

use super::Result;

/// Repository for user accounts.
///
/// Password hashes are stored next to the user but never travel inside
/// [`User`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Gets a user by their ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Gets a user by username (case-insensitive).
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Gets a user by their email address (case-insensitive).
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Lists all users ordered by full name.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Creates a user. Fails with `AlreadyExists` on a duplicate username or email.
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<()>;

    /// Updates an existing user.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Deletes a user by their ID.
    async fn delete_user(&self, id: Uuid) -> Result<()>;

    async fn get_password_hash(&self, id: Uuid) -> Result<Option<String>>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;
}

/// Repository for deals.
#[async_trait]
pub trait DealRepository: Send + Sync {
    /// Gets a deal by its ID.
    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>>;

    /// Lists all deals, most recently updated first.
    async fn list_deals(&self) -> Result<Vec<Deal>>;

    /// Creates a new deal.
    async fn create_deal(&self, deal: &Deal) -> Result<()>;

    /// Updates an existing deal.
    async fn update_deal(&self, deal: &Deal) -> Result<()>;

    /// Deletes a deal with its timeline, stars, memos, comments, assignments
    /// and documents.
    async fn delete_deal(&self, id: Uuid) -> Result<()>;
}

/// Repository for deal timeline events.
#[async_trait]
pub trait TimelineRepository: Send + Sync {
    async fn add_timeline_event(&self, event: &TimelineEvent) -> Result<()>;

    /// Lists a deal's events, newest first.
    async fn list_timeline_events(&self, deal_id: Uuid) -> Result<Vec<TimelineEvent>>;

    /// Lists the latest events across all deals, newest first.
    async fn list_recent_timeline_events(&self, limit: usize) -> Result<Vec<TimelineEvent>>;
}

/// Repository for deal stars.
#[async_trait]
pub trait StarRepository: Send + Sync {
    /// Stars a deal. Fails with `AlreadyExists` when the user already starred it.
    async fn add_star(&self, star: &DealStar) -> Result<()>;

    /// Removes a star, returning whether one existed.
    async fn remove_star(&self, deal_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn list_stars_for_deal(&self, deal_id: Uuid) -> Result<Vec<DealStar>>;

    async fn list_stars_by_user(&self, user_id: Uuid) -> Result<Vec<DealStar>>;

    async fn list_all_stars(&self) -> Result<Vec<DealStar>>;
}

/// Repository for memos and their comments.
#[async_trait]
pub trait MemoRepository: Send + Sync {
    async fn get_memo(&self, id: Uuid) -> Result<Option<MiniMemo>>;

    async fn create_memo(&self, memo: &MiniMemo) -> Result<()>;

    async fn update_memo(&self, memo: &MiniMemo) -> Result<()>;

    /// Deletes a memo and its comments.
    async fn delete_memo(&self, id: Uuid) -> Result<()>;

    /// Lists a deal's memos, newest first.
    async fn list_memos_for_deal(&self, deal_id: Uuid) -> Result<Vec<MiniMemo>>;

    async fn list_all_memos(&self) -> Result<Vec<MiniMemo>>;

    async fn add_comment(&self, comment: &MemoComment) -> Result<()>;

    /// Lists a memo's comments, oldest first.
    async fn list_comments(&self, memo_id: Uuid) -> Result<Vec<MemoComment>>;
}

/// Repository for deal assignments.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Assigns a user. Fails with `AlreadyExists` when already assigned.
    async fn assign(&self, assignment: &DealAssignment) -> Result<()>;

    /// Removes an assignment, returning whether one existed.
    async fn unassign(&self, deal_id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn list_assignments_for_deal(&self, deal_id: Uuid) -> Result<Vec<DealAssignment>>;

    async fn list_assignments_for_user(&self, user_id: Uuid) -> Result<Vec<DealAssignment>>;

    async fn list_all_assignments(&self) -> Result<Vec<DealAssignment>>;
}

/// Repository for funds, allocations and capital calls.
///
/// Allocations and calls are only written through [`apply_ledger_update`],
/// which applies every change of one ledger operation atomically.
///
/// [`apply_ledger_update`]: FundRepository::apply_ledger_update
#[async_trait]
pub trait FundRepository: Send + Sync {
    /// Gets a fund by its ID.
    async fn get_fund(&self, id: Uuid) -> Result<Option<Fund>>;

    /// Lists all funds ordered by name.
    async fn list_funds(&self) -> Result<Vec<Fund>>;

    async fn create_fund(&self, fund: &Fund) -> Result<()>;

    async fn update_fund(&self, fund: &Fund) -> Result<()>;

    /// Deletes a fund. Fails with `InvalidData` while it has allocations.
    async fn delete_fund(&self, id: Uuid) -> Result<()>;

    async fn get_allocation(&self, id: Uuid) -> Result<Option<FundAllocation>>;

    /// Lists a fund's allocations, oldest first.
    async fn list_allocations_by_fund(&self, fund_id: Uuid) -> Result<Vec<FundAllocation>>;

    async fn list_allocations_by_deal(&self, deal_id: Uuid) -> Result<Vec<FundAllocation>>;

    async fn list_all_allocations(&self) -> Result<Vec<FundAllocation>>;

    async fn get_capital_call(&self, id: Uuid) -> Result<Option<CapitalCall>>;

    /// Lists an allocation's calls ordered by call number.
    async fn list_capital_calls_by_allocation(
        &self,
        allocation_id: Uuid,
    ) -> Result<Vec<CapitalCall>>;

    async fn list_capital_calls_by_fund(&self, fund_id: Uuid) -> Result<Vec<CapitalCall>>;

    /// Lists every call ordered by due date.
    async fn list_all_capital_calls(&self) -> Result<Vec<CapitalCall>>;

    /// Applies all writes of one ledger operation, or none of them.
    ///
    /// Deleting an allocation also deletes its capital calls.
    async fn apply_ledger_update(&self, update: &LedgerUpdate) -> Result<()>;
}

/// Repository for deal documents and their content.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create_document(&self, document: &Document, content: &[u8]) -> Result<()>;

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>>;

    async fn get_document_content(&self, id: Uuid) -> Result<Option<Vec<u8>>>;

    /// Lists a deal's documents, newest first.
    async fn list_documents_for_deal(&self, deal_id: Uuid) -> Result<Vec<Document>>;

    async fn delete_document(&self, id: Uuid) -> Result<()>;
}

/// Repository for per-user notifications.
///
/// Operations on a single notification are scoped to its owner; another
/// user's notification behaves as if it did not exist.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(&self, notification: &Notification) -> Result<()>;

    /// Lists a user's notifications, newest first.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>>;

    async fn unread_count(&self, user_id: Uuid) -> Result<u64>;

    /// Marks one notification read, returning whether it was found.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Marks all of a user's notifications read, returning how many changed.
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64>;

    /// Deletes one notification, returning whether it was found.
    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<bool>;
}
