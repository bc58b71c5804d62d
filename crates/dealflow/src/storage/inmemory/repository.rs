//! In-memory repository implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
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

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
}

/// Allocations and capital calls share one lock so a ledger update is
/// applied as a unit.
#[derive(Debug, Default)]
struct Ledger {
    allocations: HashMap<Uuid, FundAllocation>,
    capital_calls: HashMap<Uuid, CapitalCall>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    document: Document,
    content: Vec<u8>,
}

/// In-memory storage backend.
///
/// Data is not persisted and is lost when the repository is dropped. Locks
/// are always taken in the order deals, funds, ledger, then the remaining
/// tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<RwLock<HashMap<Uuid, UserRecord>>>,
    deals: Arc<RwLock<HashMap<Uuid, Deal>>>,
    timeline: Arc<RwLock<Vec<TimelineEvent>>>,
    stars: Arc<RwLock<HashMap<(Uuid, Uuid), DealStar>>>,
    memos: Arc<RwLock<HashMap<Uuid, MiniMemo>>>,
    comments: Arc<RwLock<Vec<MemoComment>>>,
    assignments: Arc<RwLock<HashMap<(Uuid, Uuid), DealAssignment>>>,
    funds: Arc<RwLock<HashMap<Uuid, Fund>>>,
    ledger: Arc<RwLock<Ledger>>,
    documents: Arc<RwLock<HashMap<Uuid, StoredDocument>>>,
    notifications: Arc<RwLock<HashMap<Uuid, Notification>>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(entity_type: &'static str, id: impl ToString) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type,
        id: id.to_string(),
    }
}

fn already_exists(entity_type: &'static str, id: impl ToString) -> RepositoryError {
    RepositoryError::AlreadyExists {
        entity_type,
        id: id.to_string(),
    }
}

fn missing_reference(entity_type: &str, id: Uuid) -> RepositoryError {
    RepositoryError::InvalidData(format!("{entity_type} {id} does not exist"))
}

fn require_deal(deals: &HashMap<Uuid, Deal>, deal_id: Uuid) -> Result<()> {
    if deals.contains_key(&deal_id) {
        Ok(())
    } else {
        Err(missing_reference("Deal", deal_id))
    }
}

// ============================================================================
// UserRepository implementation
// ============================================================================

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).map(|r| r.user.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|r| r.user.username.eq_ignore_ascii_case(username))
            .map(|r| r.user.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
            .map(|r| r.user.clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        let mut list: Vec<User> = users.values().map(|r| r.user.clone()).collect();
        list.sort_by(|a, b| {
            a.full_name
                .cmp(&b.full_name)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(list)
    }

    async fn create_user(&self, user: &User, password_hash: &str) -> Result<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(already_exists("User", user.id));
        }
        if users
            .values()
            .any(|r| r.user.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(already_exists("User", &user.username));
        }
        if users
            .values()
            .any(|r| r.user.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(already_exists("User", &user.email));
        }
        users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|r| {
            r.user.id != user.id
                && (r.user.email.eq_ignore_ascii_case(&user.email)
                    || r.user.username.eq_ignore_ascii_case(&user.username))
        }) {
            return Err(already_exists("User", &user.email));
        }
        match users.get_mut(&user.id) {
            Some(record) => {
                record.user = user.clone();
                Ok(())
            }
            None => Err(not_found("User", user.id)),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        if self.users.write().await.remove(&id).is_none() {
            return Err(not_found("User", id));
        }
        self.stars.write().await.retain(|(_, user_id), _| *user_id != id);
        self.assignments
            .write()
            .await
            .retain(|(_, user_id), _| *user_id != id);
        self.notifications
            .write()
            .await
            .retain(|_, n| n.user_id != id);
        Ok(())
    }

    async fn get_password_hash(&self, id: Uuid) -> Result<Option<String>> {
        let users = self.users.read().await;
        Ok(users.get(&id).map(|r| r.password_hash.clone()))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(record) => {
                record.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(not_found("User", id)),
        }
    }
}

// ============================================================================
// DealRepository implementation
// ============================================================================

#[async_trait]
impl DealRepository for InMemoryRepository {
    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>> {
        let deals = self.deals.read().await;
        Ok(deals.get(&id).cloned())
    }

    async fn list_deals(&self) -> Result<Vec<Deal>> {
        let deals = self.deals.read().await;
        let mut list: Vec<Deal> = deals.values().cloned().collect();
        list.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(list)
    }

    async fn create_deal(&self, deal: &Deal) -> Result<()> {
        let mut deals = self.deals.write().await;
        if deals.contains_key(&deal.id) {
            return Err(already_exists("Deal", deal.id));
        }
        deals.insert(deal.id, deal.clone());
        Ok(())
    }

    async fn update_deal(&self, deal: &Deal) -> Result<()> {
        let mut deals = self.deals.write().await;
        match deals.get_mut(&deal.id) {
            Some(existing) => {
                *existing = deal.clone();
                Ok(())
            }
            None => Err(not_found("Deal", deal.id)),
        }
    }

    async fn delete_deal(&self, id: Uuid) -> Result<()> {
        let mut deals = self.deals.write().await;
        if !deals.contains_key(&id) {
            return Err(not_found("Deal", id));
        }
        if self
            .ledger
            .read()
            .await
            .allocations
            .values()
            .any(|a| a.deal_id == id)
        {
            return Err(RepositoryError::InvalidData(format!(
                "Deal {id} still has allocations"
            )));
        }
        deals.remove(&id);

        self.timeline.write().await.retain(|e| e.deal_id != id);
        self.stars.write().await.retain(|(deal_id, _), _| *deal_id != id);
        let memo_ids: HashSet<Uuid> = {
            let mut memos = self.memos.write().await;
            let ids = memos
                .values()
                .filter(|m| m.deal_id == id)
                .map(|m| m.id)
                .collect();
            memos.retain(|_, m| m.deal_id != id);
            ids
        };
        self.comments
            .write()
            .await
            .retain(|c| !memo_ids.contains(&c.memo_id));
        self.assignments
            .write()
            .await
            .retain(|(deal_id, _), _| *deal_id != id);
        self.documents
            .write()
            .await
            .retain(|_, d| d.document.deal_id != id);
        Ok(())
    }
}

// ============================================================================
// TimelineRepository implementation
// ============================================================================

#[async_trait]
impl TimelineRepository for InMemoryRepository {
    async fn add_timeline_event(&self, event: &TimelineEvent) -> Result<()> {
        let deals = self.deals.read().await;
        require_deal(&deals, event.deal_id)?;
        self.timeline.write().await.push(event.clone());
        Ok(())
    }

    async fn list_timeline_events(&self, deal_id: Uuid) -> Result<Vec<TimelineEvent>> {
        let timeline = self.timeline.read().await;
        let mut events: Vec<TimelineEvent> = timeline
            .iter()
            .filter(|e| e.deal_id == deal_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn list_recent_timeline_events(&self, limit: usize) -> Result<Vec<TimelineEvent>> {
        let timeline = self.timeline.read().await;
        let mut events: Vec<TimelineEvent> = timeline.clone();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit);
        Ok(events)
    }
}

// ============================================================================
// StarRepository implementation
// ============================================================================

#[async_trait]
impl StarRepository for InMemoryRepository {
    async fn add_star(&self, star: &DealStar) -> Result<()> {
        let deals = self.deals.read().await;
        require_deal(&deals, star.deal_id)?;
        let mut stars = self.stars.write().await;
        let key = (star.deal_id, star.user_id);
        if stars.contains_key(&key) {
            return Err(already_exists(
                "DealStar",
                format!("{}:{}", star.deal_id, star.user_id),
            ));
        }
        stars.insert(key, star.clone());
        Ok(())
    }

    async fn remove_star(&self, deal_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self
            .stars
            .write()
            .await
            .remove(&(deal_id, user_id))
            .is_some())
    }

    async fn list_stars_for_deal(&self, deal_id: Uuid) -> Result<Vec<DealStar>> {
        let stars = self.stars.read().await;
        let mut list: Vec<DealStar> = stars
            .values()
            .filter(|s| s.deal_id == deal_id)
            .cloned()
            .collect();
        list.sort_by_key(|s| s.created_at);
        Ok(list)
    }

    async fn list_stars_by_user(&self, user_id: Uuid) -> Result<Vec<DealStar>> {
        let stars = self.stars.read().await;
        let mut list: Vec<DealStar> = stars
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by_key(|s| s.created_at);
        Ok(list)
    }

    async fn list_all_stars(&self) -> Result<Vec<DealStar>> {
        let stars = self.stars.read().await;
        Ok(stars.values().cloned().collect())
    }
}

// ============================================================================
// MemoRepository implementation
// ============================================================================

#[async_trait]
impl MemoRepository for InMemoryRepository {
    async fn get_memo(&self, id: Uuid) -> Result<Option<MiniMemo>> {
        let memos = self.memos.read().await;
        Ok(memos.get(&id).cloned())
    }

    async fn create_memo(&self, memo: &MiniMemo) -> Result<()> {
        let deals = self.deals.read().await;
        require_deal(&deals, memo.deal_id)?;
        let mut memos = self.memos.write().await;
        if memos.contains_key(&memo.id) {
            return Err(already_exists("MiniMemo", memo.id));
        }
        memos.insert(memo.id, memo.clone());
        Ok(())
    }

    async fn update_memo(&self, memo: &MiniMemo) -> Result<()> {
        let mut memos = self.memos.write().await;
        match memos.get_mut(&memo.id) {
            Some(existing) => {
                *existing = memo.clone();
                Ok(())
            }
            None => Err(not_found("MiniMemo", memo.id)),
        }
    }

    async fn delete_memo(&self, id: Uuid) -> Result<()> {
        if self.memos.write().await.remove(&id).is_none() {
            return Err(not_found("MiniMemo", id));
        }
        self.comments.write().await.retain(|c| c.memo_id != id);
        Ok(())
    }

    async fn list_memos_for_deal(&self, deal_id: Uuid) -> Result<Vec<MiniMemo>> {
        let memos = self.memos.read().await;
        let mut list: Vec<MiniMemo> = memos
            .values()
            .filter(|m| m.deal_id == deal_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn list_all_memos(&self) -> Result<Vec<MiniMemo>> {
        let memos = self.memos.read().await;
        Ok(memos.values().cloned().collect())
    }

    async fn add_comment(&self, comment: &MemoComment) -> Result<()> {
        let memos = self.memos.read().await;
        if !memos.contains_key(&comment.memo_id) {
            return Err(missing_reference("MiniMemo", comment.memo_id));
        }
        self.comments.write().await.push(comment.clone());
        Ok(())
    }

    async fn list_comments(&self, memo_id: Uuid) -> Result<Vec<MemoComment>> {
        let comments = self.comments.read().await;
        let mut list: Vec<MemoComment> = comments
            .iter()
            .filter(|c| c.memo_id == memo_id)
            .cloned()
            .collect();
        list.sort_by_key(|c| c.created_at);
        Ok(list)
    }
}

// ============================================================================
// AssignmentRepository implementation
// ============================================================================

#[async_trait]
impl AssignmentRepository for InMemoryRepository {
    async fn assign(&self, assignment: &DealAssignment) -> Result<()> {
        let deals = self.deals.read().await;
        require_deal(&deals, assignment.deal_id)?;
        let mut assignments = self.assignments.write().await;
        let key = (assignment.deal_id, assignment.user_id);
        if assignments.contains_key(&key) {
            return Err(already_exists(
                "DealAssignment",
                format!("{}:{}", assignment.deal_id, assignment.user_id),
            ));
        }
        assignments.insert(key, assignment.clone());
        Ok(())
    }

    async fn unassign(&self, deal_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self
            .assignments
            .write()
            .await
            .remove(&(deal_id, user_id))
            .is_some())
    }

    async fn list_assignments_for_deal(&self, deal_id: Uuid) -> Result<Vec<DealAssignment>> {
        let assignments = self.assignments.read().await;
        let mut list: Vec<DealAssignment> = assignments
            .values()
            .filter(|a| a.deal_id == deal_id)
            .cloned()
            .collect();
        list.sort_by_key(|a| a.assigned_at);
        Ok(list)
    }

    async fn list_assignments_for_user(&self, user_id: Uuid) -> Result<Vec<DealAssignment>> {
        let assignments = self.assignments.read().await;
        let mut list: Vec<DealAssignment> = assignments
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by_key(|a| a.assigned_at);
        Ok(list)
    }

    async fn list_all_assignments(&self) -> Result<Vec<DealAssignment>> {
        let assignments = self.assignments.read().await;
        Ok(assignments.values().cloned().collect())
    }
}

// ============================================================================
// FundRepository implementation
// ============================================================================

fn sort_allocations(list: &mut [FundAllocation]) {
    list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

fn sort_calls_by_due_date(list: &mut [CapitalCall]) {
    list.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.call_number.cmp(&b.call_number))
    });
}

#[async_trait]
impl FundRepository for InMemoryRepository {
    async fn get_fund(&self, id: Uuid) -> Result<Option<Fund>> {
        let funds = self.funds.read().await;
        Ok(funds.get(&id).cloned())
    }

    async fn list_funds(&self) -> Result<Vec<Fund>> {
        let funds = self.funds.read().await;
        let mut list: Vec<Fund> = funds.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn create_fund(&self, fund: &Fund) -> Result<()> {
        let mut funds = self.funds.write().await;
        if funds.contains_key(&fund.id) {
            return Err(already_exists("Fund", fund.id));
        }
        funds.insert(fund.id, fund.clone());
        Ok(())
    }

    async fn update_fund(&self, fund: &Fund) -> Result<()> {
        let mut funds = self.funds.write().await;
        match funds.get_mut(&fund.id) {
            Some(existing) => {
                *existing = fund.clone();
                Ok(())
            }
            None => Err(not_found("Fund", fund.id)),
        }
    }

    async fn delete_fund(&self, id: Uuid) -> Result<()> {
        let mut funds = self.funds.write().await;
        if !funds.contains_key(&id) {
            return Err(not_found("Fund", id));
        }
        let ledger = self.ledger.read().await;
        if ledger.allocations.values().any(|a| a.fund_id == id) {
            return Err(RepositoryError::InvalidData(format!(
                "Fund {id} still has allocations"
            )));
        }
        funds.remove(&id);
        Ok(())
    }

    async fn get_allocation(&self, id: Uuid) -> Result<Option<FundAllocation>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.allocations.get(&id).cloned())
    }

    async fn list_allocations_by_fund(&self, fund_id: Uuid) -> Result<Vec<FundAllocation>> {
        let ledger = self.ledger.read().await;
        let mut list: Vec<FundAllocation> = ledger
            .allocations
            .values()
            .filter(|a| a.fund_id == fund_id)
            .cloned()
            .collect();
        sort_allocations(&mut list);
        Ok(list)
    }

    async fn list_allocations_by_deal(&self, deal_id: Uuid) -> Result<Vec<FundAllocation>> {
        let ledger = self.ledger.read().await;
        let mut list: Vec<FundAllocation> = ledger
            .allocations
            .values()
            .filter(|a| a.deal_id == deal_id)
            .cloned()
            .collect();
        sort_allocations(&mut list);
        Ok(list)
    }

    async fn list_all_allocations(&self) -> Result<Vec<FundAllocation>> {
        let ledger = self.ledger.read().await;
        let mut list: Vec<FundAllocation> = ledger.allocations.values().cloned().collect();
        sort_allocations(&mut list);
        Ok(list)
    }

    async fn get_capital_call(&self, id: Uuid) -> Result<Option<CapitalCall>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.capital_calls.get(&id).cloned())
    }

    async fn list_capital_calls_by_allocation(
        &self,
        allocation_id: Uuid,
    ) -> Result<Vec<CapitalCall>> {
        let ledger = self.ledger.read().await;
        let mut list: Vec<CapitalCall> = ledger
            .capital_calls
            .values()
            .filter(|c| c.allocation_id == allocation_id)
            .cloned()
            .collect();
        list.sort_by_key(|c| c.call_number);
        Ok(list)
    }

    async fn list_capital_calls_by_fund(&self, fund_id: Uuid) -> Result<Vec<CapitalCall>> {
        let ledger = self.ledger.read().await;
        let mut list: Vec<CapitalCall> = ledger
            .capital_calls
            .values()
            .filter(|c| c.fund_id == fund_id)
            .cloned()
            .collect();
        sort_calls_by_due_date(&mut list);
        Ok(list)
    }

    async fn list_all_capital_calls(&self) -> Result<Vec<CapitalCall>> {
        let ledger = self.ledger.read().await;
        let mut list: Vec<CapitalCall> = ledger.capital_calls.values().cloned().collect();
        sort_calls_by_due_date(&mut list);
        Ok(list)
    }

    async fn apply_ledger_update(&self, update: &LedgerUpdate) -> Result<()> {
        let deals = self.deals.read().await;
        let funds = self.funds.read().await;
        let mut ledger = self.ledger.write().await;

        // Validate everything before the first write.
        for allocation in &update.upsert_allocations {
            if !funds.contains_key(&allocation.fund_id) {
                return Err(missing_reference("Fund", allocation.fund_id));
            }
            require_deal(&deals, allocation.deal_id)?;
        }
        let deleted: HashSet<Uuid> = update.delete_allocations.iter().copied().collect();
        for call in &update.upsert_capital_calls {
            let known = ledger.allocations.contains_key(&call.allocation_id)
                || update
                    .upsert_allocations
                    .iter()
                    .any(|a| a.id == call.allocation_id);
            if !known || deleted.contains(&call.allocation_id) {
                return Err(missing_reference("FundAllocation", call.allocation_id));
            }
        }

        for id in &update.delete_capital_calls {
            ledger.capital_calls.remove(id);
        }
        for id in &update.delete_allocations {
            ledger.allocations.remove(id);
            ledger.capital_calls.retain(|_, c| c.allocation_id != *id);
        }
        for allocation in &update.upsert_allocations {
            ledger.allocations.insert(allocation.id, allocation.clone());
        }
        for call in &update.upsert_capital_calls {
            ledger.capital_calls.insert(call.id, call.clone());
        }
        Ok(())
    }
}

// ============================================================================
// DocumentRepository implementation
// ============================================================================

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn create_document(&self, document: &Document, content: &[u8]) -> Result<()> {
        let deals = self.deals.read().await;
        require_deal(&deals, document.deal_id)?;
        let mut documents = self.documents.write().await;
        if documents.contains_key(&document.id) {
            return Err(already_exists("Document", document.id));
        }
        documents.insert(
            document.id,
            StoredDocument {
                document: document.clone(),
                content: content.to_vec(),
            },
        );
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id).map(|d| d.document.clone()))
    }

    async fn get_document_content(&self, id: Uuid) -> Result<Option<Vec<u8>>> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id).map(|d| d.content.clone()))
    }

    async fn list_documents_for_deal(&self, deal_id: Uuid) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut list: Vec<Document> = documents
            .values()
            .filter(|d| d.document.deal_id == deal_id)
            .map(|d| d.document.clone())
            .collect();
        list.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(list)
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        match self.documents.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(not_found("Document", id)),
        }
    }
}

// ============================================================================
// NotificationRepository implementation
// ============================================================================

#[async_trait]
impl NotificationRepository for InMemoryRepository {
    async fn create_notification(&self, notification: &Notification) -> Result<()> {
        let mut notifications = self.notifications.write().await;
        if notifications.contains_key(&notification.id) {
            return Err(already_exists("Notification", notification.id));
        }
        notifications.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut list: Vec<Notification> = notifications
            .values()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit);
        Ok(list)
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as u64)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut notifications = self.notifications.write().await;
        match notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let mut notifications = self.notifications.write().await;
        let mut changed = 0;
        for n in notifications
            .values_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut notifications = self.notifications.write().await;
        if notifications.get(&id).is_some_and(|n| n.user_id == user_id) {
            notifications.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
