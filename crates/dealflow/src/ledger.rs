//! Fund ledger service.
//!
//! Every operation that reads a fund's allocations or capital calls and
//! writes derived values runs under that fund's lock, and persists its
//! writes with one [`FundRepository::apply_ledger_update`] call. Timeline
//! entries, notifications and the deal stage change are written after the
//! ledger commit; a failure there is logged and does not undo the commit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use dealflow_core::deal::{change_stage, Deal, DealStage, TimelineEvent, TimelineEventType};
use dealflow_core::fund::{
    apply_payment, check_fund_capacity, derive_allocation_status, generate_capital_calls,
    new_capital_call, recalculate_portfolio_weights, rollup_allocation, transition_call_status,
    validate_create_allocation, validate_currency, validate_fund, validate_update_allocation,
    AllocationStatus, CapitalCall, CapitalCallStatus, CreateAllocationRequest,
    CreateCapitalCallRequest, Fund, FundAllocation, FundError, LedgerUpdate,
    RecordPaymentRequest, ScheduleCallsRequest, UpdateAllocationRequest, UpdateFundRequest,
};
use dealflow_core::notification::{builders, format_money, Notification};
use dealflow_core::storage::{
    DealRepository, FundRepository, NotificationRepository, RepositoryError,
    TimelineRepository, UserRepository,
};
use dealflow_core::user::User;

fn not_found(entity_type: &'static str, id: Uuid) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type,
        id: id.to_string(),
    }
}

type LockMap = StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>;

/// Holds one fund's lock. Dropping it removes the map entry once no other
/// task holds or waits for the same fund.
struct FundLock<'a> {
    locks: &'a LockMap,
    fund_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FundLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        self.guard.take();
        // Waiters clone the Arc under the map lock, so a count of one means idle.
        if locks
            .get(&self.fund_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.fund_id);
        }
    }
}

/// Orchestrates allocations and capital calls over the repositories.
pub struct FundLedger {
    funds: Arc<dyn FundRepository>,
    deals: Arc<dyn DealRepository>,
    timeline: Arc<dyn TimelineRepository>,
    notifications: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserRepository>,
    locks: LockMap,
}

impl FundLedger {
    pub fn new(
        funds: Arc<dyn FundRepository>,
        deals: Arc<dyn DealRepository>,
        timeline: Arc<dyn TimelineRepository>,
        notifications: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            funds,
            deals,
            timeline,
            notifications,
            users,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    async fn lock_fund(&self, fund_id: Uuid) -> FundLock<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(fund_id).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        FundLock {
            locks: &self.locks,
            fund_id,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn require_fund(&self, id: Uuid) -> anyhow::Result<Fund> {
        Ok(self
            .funds
            .get_fund(id)
            .await?
            .ok_or_else(|| not_found("Fund", id))?)
    }

    async fn require_deal(&self, id: Uuid) -> anyhow::Result<Deal> {
        Ok(self
            .deals
            .get_deal(id)
            .await?
            .ok_or_else(|| not_found("Deal", id))?)
    }

    async fn require_allocation(&self, id: Uuid) -> anyhow::Result<FundAllocation> {
        Ok(self
            .funds
            .get_allocation(id)
            .await?
            .ok_or_else(|| not_found("FundAllocation", id))?)
    }

    async fn require_call(&self, id: Uuid) -> anyhow::Result<CapitalCall> {
        Ok(self
            .funds
            .get_capital_call(id)
            .await?
            .ok_or_else(|| not_found("CapitalCall", id))?)
    }

    /// Update a fund. Lowering the target size below committed capital fails.
    pub async fn update_fund(&self, id: Uuid, request: UpdateFundRequest) -> anyhow::Result<Fund> {
        let _guard = self.lock_fund(id).await;
        let mut fund = self.require_fund(id).await?;
        let resizes = request.changes_target_size();
        request.apply_to(&mut fund);
        validate_fund(&fund)?;
        validate_currency(&fund.currency)?;

        if resizes {
            let allocations = self.funds.list_allocations_by_fund(id).await?;
            check_fund_capacity(&fund, &allocations, 0, None)?;
        }

        self.funds.update_fund(&fund).await?;
        tracing::info!(fund_id = %id, "Fund updated");
        Ok(fund)
    }

    /// Delete a fund that has no allocations.
    pub async fn delete_fund(&self, id: Uuid) -> anyhow::Result<()> {
        let _guard = self.lock_fund(id).await;
        self.require_fund(id).await?;
        if !self.funds.list_allocations_by_fund(id).await?.is_empty() {
            return Err(FundError::FundHasAllocations.into());
        }
        self.funds.delete_fund(id).await?;
        tracing::info!(fund_id = %id, "Fund deleted");
        Ok(())
    }

    /// Commit a fund to a deal and move the deal to `invested`.
    pub async fn create_allocation(
        &self,
        request: CreateAllocationRequest,
        actor: &User,
    ) -> anyhow::Result<FundAllocation> {
        validate_create_allocation(&request)?;
        let now = Utc::now();

        let (fund, deal, allocation) = {
            let _guard = self.lock_fund(request.fund_id).await;
            let fund = self.require_fund(request.fund_id).await?;
            let deal = self.require_deal(request.deal_id).await?;

            let mut allocations = self.funds.list_allocations_by_fund(fund.id).await?;
            check_fund_capacity(&fund, &allocations, request.amount, None)?;

            let mut allocation = FundAllocation::new(
                fund.id,
                deal.id,
                request.amount,
                request.allocation_date.unwrap_or_else(|| now.date_naive()),
            );
            if let Some(security_type) = request.security_type {
                allocation.security_type = security_type;
            }
            allocation.market_value = request.market_value;
            allocation.notes = request.notes;
            let id = allocation.id;
            allocations.push(allocation);
            recalculate_portfolio_weights(&mut allocations);

            let allocation = allocations
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| not_found("FundAllocation", id))?;
            self.funds
                .apply_ledger_update(&LedgerUpdate {
                    upsert_allocations: allocations,
                    ..Default::default()
                })
                .await?;
            (fund, deal, allocation)
        };

        tracing::info!(
            allocation_id = %allocation.id,
            fund_id = %fund.id,
            deal_id = %deal.id,
            amount = allocation.amount,
            "Allocation created"
        );

        let event = TimelineEvent::new(
            deal.id,
            TimelineEventType::Allocation,
            format!(
                "{} committed {}",
                fund.name,
                format_money(allocation.amount, &fund.currency)
            ),
            Some(actor.id),
        )
        .with_metadata(json!({
            "fund_id": fund.id,
            "allocation_id": allocation.id,
            "amount": allocation.amount,
        }));
        self.record_event(&event).await;
        self.mark_invested(deal, actor.id, now).await;

        Ok(allocation)
    }

    async fn mark_invested(&self, mut deal: Deal, actor: Uuid, now: DateTime<Utc>) {
        if deal.stage == DealStage::Invested {
            return;
        }
        let Ok(event) = change_stage(&mut deal, DealStage::Invested, None, Some(actor), now) else {
            return;
        };
        if let Err(err) = self.deals.update_deal(&deal).await {
            tracing::warn!(deal_id = %deal.id, error = %err, "Failed to move deal to invested");
            return;
        }
        self.record_event(&event).await;
    }

    /// Update an allocation's terms.
    pub async fn update_allocation(
        &self,
        id: Uuid,
        request: UpdateAllocationRequest,
    ) -> anyhow::Result<FundAllocation> {
        validate_update_allocation(&request)?;
        let fund_id = self.require_allocation(id).await?.fund_id;
        let _guard = self.lock_fund(fund_id).await;

        let fund = self.require_fund(fund_id).await?;
        let mut allocations = self.funds.list_allocations_by_fund(fund_id).await?;
        let index = allocations
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| not_found("FundAllocation", id))?;
        let calls = self.funds.list_capital_calls_by_allocation(id).await?;

        let mut allocation = allocations[index].clone();
        let was_written_off = allocation.is_written_off();
        let previous_amount = allocation.amount;

        if let Some(amount) = request.amount {
            let called: i64 = calls.iter().map(|c| c.call_amount).sum();
            if amount < called {
                return Err(FundError::AmountBelowCalled { amount, called }.into());
            }
            allocation.amount = amount;
        }
        if let Some(security_type) = request.security_type {
            allocation.security_type = security_type;
        }
        if let Some(date) = request.allocation_date {
            allocation.allocation_date = date;
        }
        if let Some(value) = request.market_value {
            allocation.market_value = Some(value);
        }
        if let Some(returned) = request.total_returned {
            allocation.total_returned = returned;
        }
        if let Some(notes) = request.notes {
            allocation.notes = Some(notes);
        }
        allocation.status = match request.written_off {
            Some(true) => AllocationStatus::WrittenOff,
            Some(false) if was_written_off => derive_allocation_status(
                allocation.amount,
                allocation.paid_amount,
                AllocationStatus::Committed,
            ),
            _ => derive_allocation_status(
                allocation.amount,
                allocation.paid_amount,
                allocation.status,
            ),
        };

        let grows = allocation.amount != previous_amount || was_written_off;
        if !allocation.is_written_off() && grows {
            check_fund_capacity(&fund, &allocations, allocation.amount, Some(id))?;
        }
        allocation.updated_at = Utc::now();

        allocations[index] = allocation;
        recalculate_portfolio_weights(&mut allocations);
        let allocation = allocations[index].clone();

        self.funds
            .apply_ledger_update(&LedgerUpdate {
                upsert_allocations: allocations,
                ..Default::default()
            })
            .await?;

        tracing::info!(allocation_id = %id, status = allocation.status.as_str(), "Allocation updated");
        Ok(allocation)
    }

    /// Delete an allocation together with its capital calls.
    pub async fn delete_allocation(&self, id: Uuid) -> anyhow::Result<()> {
        let fund_id = self.require_allocation(id).await?.fund_id;
        let _guard = self.lock_fund(fund_id).await;

        let mut allocations = self.funds.list_allocations_by_fund(fund_id).await?;
        if !allocations.iter().any(|a| a.id == id) {
            return Err(not_found("FundAllocation", id).into());
        }
        allocations.retain(|a| a.id != id);
        recalculate_portfolio_weights(&mut allocations);

        self.funds
            .apply_ledger_update(&LedgerUpdate {
                upsert_allocations: allocations,
                delete_allocations: vec![id],
                ..Default::default()
            })
            .await?;

        tracing::info!(allocation_id = %id, fund_id = %fund_id, "Allocation deleted");
        Ok(())
    }

    /// Recompute and persist every allocation's portfolio weight in a fund.
    pub async fn recalculate_weights(&self, fund_id: Uuid) -> anyhow::Result<Vec<FundAllocation>> {
        let _guard = self.lock_fund(fund_id).await;
        self.require_fund(fund_id).await?;

        let mut allocations = self.funds.list_allocations_by_fund(fund_id).await?;
        recalculate_portfolio_weights(&mut allocations);
        if !allocations.is_empty() {
            self.funds
                .apply_ledger_update(&LedgerUpdate {
                    upsert_allocations: allocations.clone(),
                    ..Default::default()
                })
                .await?;
        }

        tracing::debug!(fund_id = %fund_id, count = allocations.len(), "Weights recalculated");
        Ok(allocations)
    }

    /// Issue one capital call against an allocation.
    pub async fn create_capital_call(
        &self,
        allocation_id: Uuid,
        request: CreateCapitalCallRequest,
        actor: &User,
    ) -> anyhow::Result<CapitalCall> {
        let fund_id = self.require_allocation(allocation_id).await?.fund_id;
        let today = Utc::now().date_naive();

        let (allocation, call) = {
            let _guard = self.lock_fund(fund_id).await;
            let allocation = self.require_allocation(allocation_id).await?;
            let existing = self
                .funds
                .list_capital_calls_by_allocation(allocation_id)
                .await?;
            let call = new_capital_call(&allocation, &existing, &request, today)?;
            self.funds
                .apply_ledger_update(&LedgerUpdate {
                    upsert_capital_calls: vec![call.clone()],
                    ..Default::default()
                })
                .await?;
            (allocation, call)
        };

        tracing::info!(
            call_id = %call.id,
            allocation_id = %allocation_id,
            amount = call.call_amount,
            "Capital call created"
        );
        self.after_calls_issued(&allocation, std::slice::from_ref(&call), actor)
            .await;
        Ok(call)
    }

    /// Generate a series of capital calls for the uncalled commitment.
    pub async fn schedule_capital_calls(
        &self,
        allocation_id: Uuid,
        request: ScheduleCallsRequest,
        actor: &User,
    ) -> anyhow::Result<Vec<CapitalCall>> {
        let fund_id = self.require_allocation(allocation_id).await?.fund_id;
        let today = Utc::now().date_naive();

        let (allocation, plan) = {
            let _guard = self.lock_fund(fund_id).await;
            let allocation = self.require_allocation(allocation_id).await?;
            let existing = self
                .funds
                .list_capital_calls_by_allocation(allocation_id)
                .await?;
            let plan = generate_capital_calls(&allocation, &existing, &request, today)?;
            self.funds
                .apply_ledger_update(&LedgerUpdate {
                    upsert_capital_calls: plan.new_calls.clone(),
                    delete_capital_calls: plan.removed.clone(),
                    ..Default::default()
                })
                .await?;
            (allocation, plan)
        };

        tracing::info!(
            allocation_id = %allocation_id,
            created = plan.new_calls.len(),
            removed = plan.removed.len(),
            "Capital calls scheduled"
        );
        self.after_calls_issued(&allocation, &plan.new_calls, actor)
            .await;
        Ok(plan.new_calls)
    }

    async fn after_calls_issued(
        &self,
        allocation: &FundAllocation,
        calls: &[CapitalCall],
        actor: &User,
    ) {
        let (Some(first), Some(last)) = (calls.first(), calls.last()) else {
            return;
        };
        let total: i64 = calls.iter().map(|c| c.call_amount).sum();
        let currency = self.currency_of(allocation.fund_id).await;
        let content = if calls.len() == 1 {
            format!(
                "Capital call #{} for {} due {}",
                first.call_number,
                format_money(total, &currency),
                first.due_date
            )
        } else {
            format!(
                "{} capital calls scheduled for {} from {} to {}",
                calls.len(),
                format_money(total, &currency),
                first.call_date,
                last.call_date
            )
        };
        let event = TimelineEvent::new(
            allocation.deal_id,
            TimelineEventType::CapitalCall,
            content,
            Some(actor.id),
        )
        .with_metadata(json!({
            "allocation_id": allocation.id,
            "call_ids": calls.iter().map(|c| c.id).collect::<Vec<_>>(),
            "total": total,
        }));
        self.record_event(&event).await;

        let Some(deal) = self.find_deal(allocation.deal_id).await else {
            return;
        };
        for call in calls
            .iter()
            .filter(|c| c.status == CapitalCallStatus::Called)
        {
            self.notify_fund_managers(actor.id, |recipient| {
                builders::capital_call_issued(recipient, &deal, call, &currency)
            })
            .await;
        }
    }

    /// Record money received against a capital call.
    pub async fn record_payment(
        &self,
        call_id: Uuid,
        request: RecordPaymentRequest,
        actor: &User,
    ) -> anyhow::Result<CapitalCall> {
        let fund_id = self.require_call(call_id).await?.fund_id;
        let now = Utc::now();
        let paid_date: NaiveDate = request.paid_date.unwrap_or_else(|| now.date_naive());

        let (allocation, call) = {
            let _guard = self.lock_fund(fund_id).await;
            let mut call = self.require_call(call_id).await?;
            let mut allocation = self.require_allocation(call.allocation_id).await?;
            apply_payment(&mut call, request.amount, paid_date, now)?;

            let mut calls = self
                .funds
                .list_capital_calls_by_allocation(allocation.id)
                .await?;
            for existing in calls.iter_mut().filter(|c| c.id == call.id) {
                *existing = call.clone();
            }
            rollup_allocation(&mut allocation, &calls, now);

            self.funds
                .apply_ledger_update(&LedgerUpdate {
                    upsert_allocations: vec![allocation.clone()],
                    upsert_capital_calls: vec![call.clone()],
                    ..Default::default()
                })
                .await?;
            (allocation, call)
        };

        tracing::info!(
            call_id = %call_id,
            amount = request.amount,
            status = %call.status,
            allocation_status = allocation.status.as_str(),
            "Payment recorded"
        );

        let currency = self.currency_of(allocation.fund_id).await;
        if let Some(deal) = self.find_deal(allocation.deal_id).await {
            self.notify_fund_managers(actor.id, |recipient| {
                builders::payment_recorded(recipient, &deal, &call, request.amount, &currency)
            })
            .await;
        }
        Ok(call)
    }

    /// Move a capital call to another status by hand.
    pub async fn change_call_status(
        &self,
        call_id: Uuid,
        status: CapitalCallStatus,
        actor: &User,
    ) -> anyhow::Result<CapitalCall> {
        let fund_id = self.require_call(call_id).await?.fund_id;

        let call = {
            let _guard = self.lock_fund(fund_id).await;
            let mut call = self.require_call(call_id).await?;
            transition_call_status(&mut call, status, Utc::now())?;
            self.funds
                .apply_ledger_update(&LedgerUpdate {
                    upsert_capital_calls: vec![call.clone()],
                    ..Default::default()
                })
                .await?;
            call
        };

        tracing::info!(call_id = %call_id, status = %call.status, "Capital call status changed");

        if call.status == CapitalCallStatus::Called {
            if let Some(allocation) = self.funds.get_allocation(call.allocation_id).await.ok().flatten()
            {
                let currency = self.currency_of(allocation.fund_id).await;
                if let Some(deal) = self.find_deal(allocation.deal_id).await {
                    self.notify_fund_managers(actor.id, |recipient| {
                        builders::capital_call_issued(recipient, &deal, &call, &currency)
                    })
                    .await;
                }
            }
        }
        Ok(call)
    }

    /// Delete a capital call that has no payments.
    pub async fn delete_capital_call(&self, call_id: Uuid) -> anyhow::Result<()> {
        let fund_id = self.require_call(call_id).await?.fund_id;
        let _guard = self.lock_fund(fund_id).await;

        let call = self.require_call(call_id).await?;
        if call.paid_amount > 0 {
            return Err(FundError::CallHasPayments.into());
        }
        let mut allocation = self.require_allocation(call.allocation_id).await?;
        let remaining: Vec<CapitalCall> = self
            .funds
            .list_capital_calls_by_allocation(allocation.id)
            .await?
            .into_iter()
            .filter(|c| c.id != call_id)
            .collect();
        let mut update = LedgerUpdate {
            delete_capital_calls: vec![call_id],
            ..Default::default()
        };
        let before = (allocation.paid_amount, allocation.status);
        rollup_allocation(&mut allocation, &remaining, Utc::now());
        if (allocation.paid_amount, allocation.status) != before {
            update.upsert_allocations.push(allocation);
        }
        self.funds.apply_ledger_update(&update).await?;

        tracing::info!(call_id = %call_id, "Capital call deleted");
        Ok(())
    }

    async fn currency_of(&self, fund_id: Uuid) -> String {
        match self.funds.get_fund(fund_id).await {
            Ok(Some(fund)) => fund.currency,
            _ => "USD".to_string(),
        }
    }

    async fn find_deal(&self, deal_id: Uuid) -> Option<Deal> {
        match self.deals.get_deal(deal_id).await {
            Ok(deal) => deal,
            Err(err) => {
                tracing::warn!(deal_id = %deal_id, error = %err, "Failed to load deal");
                None
            }
        }
    }

    async fn record_event(&self, event: &TimelineEvent) {
        if let Err(err) = self.timeline.add_timeline_event(event).await {
            tracing::warn!(
                deal_id = %event.deal_id,
                event_type = event.event_type.as_str(),
                error = %err,
                "Failed to record timeline event"
            );
        }
    }

    /// Send a notification to every admin and partner except `actor`.
    async fn notify_fund_managers<F>(&self, actor: Uuid, build: F)
    where
        F: Fn(Uuid) -> Notification,
    {
        let users = match self.users.list_users().await {
            Ok(users) => users,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to list notification recipients");
                return;
            }
        };
        for user in users
            .iter()
            .filter(|u| u.role.can_manage_funds() && u.id != actor)
        {
            if let Err(err) = self.notifications.create_notification(&build(user.id)).await {
                tracing::warn!(user_id = %user.id, error = %err, "Failed to create notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dealflow_core::fund::{CallFrequency, SecurityType};
    use dealflow_core::notification::NotificationKind;
    use dealflow_core::storage::{NotificationRepository, TimelineRepository};
    use dealflow_core::user::UserRole;

    use crate::storage::InMemoryRepository;

    struct Fixture {
        repo: Arc<InMemoryRepository>,
        ledger: Arc<FundLedger>,
        admin: User,
        partner: User,
        fund: Fund,
        deal: Deal,
    }

    async fn fixture(target_size: Option<i64>) -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let ledger = Arc::new(FundLedger::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            repo.clone(),
            repo.clone(),
        ));

        let admin = User::new("ada", "Ada Admin", "ada@example.com", UserRole::Admin);
        let partner = User::new("pat", "Pat Partner", "pat@example.com", UserRole::Partner);
        repo.create_user(&admin, "x").await.unwrap();
        repo.create_user(&partner, "x").await.unwrap();

        let mut fund = Fund::new("Fund I");
        fund.target_size = target_size;
        repo.create_fund(&fund).await.unwrap();
        let deal = Deal::new("Acme", admin.id);
        repo.create_deal(&deal).await.unwrap();

        Fixture {
            repo,
            ledger,
            admin,
            partner,
            fund,
            deal,
        }
    }

    fn allocation_request(fund: &Fund, deal: &Deal, amount: i64) -> CreateAllocationRequest {
        CreateAllocationRequest {
            fund_id: fund.id,
            deal_id: deal.id,
            amount,
            security_type: Some(SecurityType::Safe),
            allocation_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            market_value: None,
            notes: None,
        }
    }

    fn amount_call(amount: i64) -> CreateCapitalCallRequest {
        CreateCapitalCallRequest {
            call_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            call_amount: Some(amount),
            ..Default::default()
        }
    }

    fn payment(amount: i64) -> RecordPaymentRequest {
        RecordPaymentRequest {
            amount,
            paid_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_allocation_moves_deal_to_invested() {
        let fx = fixture(Some(1_000_000)).await;
        let allocation = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 250_000), &fx.admin)
            .await
            .unwrap();

        assert_eq!(allocation.portfolio_weight, 100.0);
        assert_eq!(allocation.security_type, SecurityType::Safe);

        let deal = fx.repo.get_deal(fx.deal.id).await.unwrap().unwrap();
        assert_eq!(deal.stage, DealStage::Invested);

        let events = fx.repo.list_timeline_events(fx.deal.id).await.unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert!(kinds.contains(&TimelineEventType::Allocation));
        assert!(kinds.contains(&TimelineEventType::StageChange));
    }

    #[tokio::test]
    async fn test_create_allocation_rejects_over_capacity() {
        let fx = fixture(Some(1_000_000)).await;
        fx.ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 800_000), &fx.admin)
            .await
            .unwrap();

        let err = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 300_000), &fx.admin)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<FundError>(),
            Some(&FundError::ExceedsFundSize {
                target: 1_000_000,
                committed: 800_000,
                requested: 300_000,
            })
        );
        let allocations = fx.repo.list_allocations_by_fund(fx.fund.id).await.unwrap();
        assert_eq!(allocations.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_allocations_respect_capacity() {
        let fx = fixture(Some(1_000_000)).await;
        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = fx.ledger.clone();
            let request = allocation_request(&fx.fund, &fx.deal, 200_000);
            let actor = fx.admin.clone();
            handles.push(tokio::spawn(async move {
                ledger.create_allocation(request, &actor).await.is_ok()
            }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 5);

        let allocations = fx.repo.list_allocations_by_fund(fx.fund.id).await.unwrap();
        let committed: i64 = allocations.iter().map(|a| a.amount).sum();
        assert_eq!(committed, 1_000_000);
    }

    #[tokio::test]
    async fn test_weights_follow_allocations() {
        let fx = fixture(None).await;
        let other = Deal::new("Globex", fx.admin.id);
        fx.repo.create_deal(&other).await.unwrap();

        let first = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 300_000), &fx.admin)
            .await
            .unwrap();
        fx.ledger
            .create_allocation(allocation_request(&fx.fund, &other, 100_000), &fx.admin)
            .await
            .unwrap();

        let stored = fx.repo.get_allocation(first.id).await.unwrap().unwrap();
        assert_eq!(stored.portfolio_weight, 75.0);

        let allocations = fx.ledger.recalculate_weights(fx.fund.id).await.unwrap();
        let total: f64 = allocations.iter().map(|a| a.portfolio_weight).sum();
        assert!((total - 100.0).abs() < 1e-6);

        fx.ledger.delete_allocation(first.id).await.unwrap();
        let remaining = fx.repo.list_allocations_by_fund(fx.fund.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].portfolio_weight, 100.0);
    }

    #[tokio::test]
    async fn test_update_allocation_guards_called_amount() {
        let fx = fixture(Some(1_000_000)).await;
        let allocation = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 500_000), &fx.admin)
            .await
            .unwrap();
        fx.ledger
            .create_capital_call(allocation.id, amount_call(200_000), &fx.admin)
            .await
            .unwrap();

        let err = fx
            .ledger
            .update_allocation(
                allocation.id,
                UpdateAllocationRequest {
                    amount: Some(150_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FundError>(),
            Some(FundError::AmountBelowCalled { .. })
        ));

        let err = fx
            .ledger
            .update_allocation(
                allocation.id,
                UpdateAllocationRequest {
                    amount: Some(1_200_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FundError>(),
            Some(FundError::ExceedsFundSize { .. })
        ));

        let updated = fx
            .ledger
            .update_allocation(
                allocation.id,
                UpdateAllocationRequest {
                    written_off: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, AllocationStatus::WrittenOff);
        assert_eq!(updated.portfolio_weight, 0.0);
    }

    #[tokio::test]
    async fn test_schedule_and_pay_capital_calls() {
        let fx = fixture(None).await;
        let allocation = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 100_000), &fx.admin)
            .await
            .unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let calls = fx
            .ledger
            .schedule_capital_calls(
                allocation.id,
                ScheduleCallsRequest::periodic(CallFrequency::Quarterly, start, 3),
                &fx.admin,
            )
            .await
            .unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls.iter().map(|c| c.call_amount).sum::<i64>(), 100_000);

        let first = &calls[0];
        let paid = fx
            .ledger
            .record_payment(first.id, payment(first.call_amount), &fx.admin)
            .await
            .unwrap();
        assert_eq!(paid.status, CapitalCallStatus::Paid);

        let stored = fx.repo.get_allocation(allocation.id).await.unwrap().unwrap();
        assert_eq!(stored.paid_amount, first.call_amount);
        assert_eq!(stored.status, AllocationStatus::PartiallyPaid);

        let notifications = fx
            .repo
            .list_notifications(fx.partner.id, false, 50)
            .await
            .unwrap();
        assert!(notifications
            .iter()
            .any(|n| n.kind == NotificationKind::PaymentRecorded));
        let own = fx
            .repo
            .list_notifications(fx.admin.id, false, 50)
            .await
            .unwrap();
        assert!(own.is_empty());
    }

    #[tokio::test]
    async fn test_overpayment_leaves_ledger_untouched() {
        let fx = fixture(None).await;
        let allocation = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 100_000), &fx.admin)
            .await
            .unwrap();
        let call = fx
            .ledger
            .create_capital_call(allocation.id, amount_call(40_000), &fx.admin)
            .await
            .unwrap();

        let err = fx
            .ledger
            .record_payment(call.id, payment(50_000), &fx.admin)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FundError>(),
            Some(FundError::Overpayment { .. })
        ));
        let stored = fx.repo.get_capital_call(call.id).await.unwrap().unwrap();
        assert_eq!(stored.paid_amount, 0);
    }

    #[tokio::test]
    async fn test_call_status_transitions() {
        let fx = fixture(None).await;
        let allocation = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 100_000), &fx.admin)
            .await
            .unwrap();
        let call = fx
            .ledger
            .create_capital_call(allocation.id, amount_call(40_000), &fx.admin)
            .await
            .unwrap();

        let defaulted = fx
            .ledger
            .change_call_status(call.id, CapitalCallStatus::Defaulted, &fx.admin)
            .await
            .unwrap();
        assert_eq!(defaulted.status, CapitalCallStatus::Defaulted);

        let err = fx
            .ledger
            .record_payment(call.id, payment(1_000), &fx.admin)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FundError>(),
            Some(FundError::InvalidCallTransition { .. })
        ));

        let err = fx
            .ledger
            .change_call_status(call.id, CapitalCallStatus::Paid, &fx.admin)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<FundError>().is_some());
    }

    #[tokio::test]
    async fn test_delete_capital_call_requires_no_payments() {
        let fx = fixture(None).await;
        let allocation = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 100_000), &fx.admin)
            .await
            .unwrap();
        let paid = fx
            .ledger
            .create_capital_call(allocation.id, amount_call(40_000), &fx.admin)
            .await
            .unwrap();
        let unpaid = fx
            .ledger
            .create_capital_call(allocation.id, amount_call(10_000), &fx.admin)
            .await
            .unwrap();
        fx.ledger
            .record_payment(paid.id, payment(5_000), &fx.admin)
            .await
            .unwrap();

        let err = fx.ledger.delete_capital_call(paid.id).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<FundError>(),
            Some(&FundError::CallHasPayments)
        );

        fx.ledger.delete_capital_call(unpaid.id).await.unwrap();
        let calls = fx
            .repo
            .list_capital_calls_by_allocation(allocation.id)
            .await
            .unwrap();
        assert_eq!(calls.len(), 1);
    }

    #[tokio::test]
    async fn test_fund_delete_and_resize_guards() {
        let fx = fixture(Some(1_000_000)).await;
        let allocation = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 600_000), &fx.admin)
            .await
            .unwrap();

        let err = fx.ledger.delete_fund(fx.fund.id).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<FundError>(),
            Some(&FundError::FundHasAllocations)
        );

        let err = fx
            .ledger
            .update_fund(
                fx.fund.id,
                UpdateFundRequest {
                    target_size: Some(500_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FundError>(),
            Some(FundError::ExceedsFundSize { .. })
        ));

        fx.ledger.delete_allocation(allocation.id).await.unwrap();
        fx.ledger.delete_fund(fx.fund.id).await.unwrap();
        assert!(fx.repo.get_fund(fx.fund.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_fund_is_not_found() {
        let fx = fixture(None).await;
        let mut request = allocation_request(&fx.fund, &fx.deal, 1_000);
        request.fund_id = Uuid::new_v4();
        let err = fx
            .ledger
            .create_allocation(request, &fx.admin)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::NotFound { entity_type: "Fund", .. })
        ));
    }

    #[tokio::test]
    async fn test_fund_locks_are_released() {
        let fx = fixture(Some(1_000_000)).await;
        for _ in 0..100 {
            let err = fx.ledger.delete_fund(Uuid::new_v4()).await.unwrap_err();
            assert!(err.downcast_ref::<RepositoryError>().is_some());
        }
        assert_eq!(fx.ledger.lock_count(), 0);

        let allocation = fx
            .ledger
            .create_allocation(allocation_request(&fx.fund, &fx.deal, 1_000), &fx.admin)
            .await
            .unwrap();
        assert_eq!(fx.ledger.lock_count(), 0);

        fx.ledger.delete_allocation(allocation.id).await.unwrap();
        fx.ledger.delete_fund(fx.fund.id).await.unwrap();
        assert_eq!(fx.ledger.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_contended_fund_lock_survives_until_last_holder() {
        let fx = fixture(None).await;
        let first = fx.ledger.lock_fund(fx.fund.id).await;

        let ledger = fx.ledger.clone();
        let fund_id = fx.fund.id;
        let waiter = tokio::spawn(async move {
            let _second = ledger.lock_fund(fund_id).await;
        });
        while !waiter_is_queued(&fx.ledger, fund_id) {
            tokio::task::yield_now().await;
        }

        drop(first);
        assert_eq!(fx.ledger.lock_count(), 1);
        waiter.await.unwrap();
        assert_eq!(fx.ledger.lock_count(), 0);
    }

    fn waiter_is_queued(ledger: &FundLedger, fund_id: Uuid) -> bool {
        ledger
            .locks
            .lock()
            .unwrap()
            .get(&fund_id)
            .is_some_and(|lock| Arc::strong_count(lock) >= 3)
    }
}
