//! Cached fund repository decorator.
//!
//! Caches fund metadata and the allocation list of each fund. Ledger updates
//! drop the derived keys of every fund they touch.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use dealflow_core::cache::{
    deserialize, fund_allocations_key, fund_key, fund_pattern, serialize, Cache,
};
use dealflow_core::fund::{CapitalCall, Fund, FundAllocation, LedgerUpdate};
use dealflow_core::storage::{FundRepository, Result};

/// Cached fund repository decorator.
///
/// # Type Parameters
///
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation
pub struct CachedFundRepository<R, C>
where
    R: FundRepository,
    C: Cache,
{
    repository: Arc<R>,
    cache: Arc<C>,
    ttl: Duration,
}

impl<R, C> CachedFundRepository<R, C>
where
    R: FundRepository,
    C: Cache,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            ttl,
        }
    }

    async fn cached<T>(&self, key: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match deserialize(&bytes) {
                Ok(value) => {
                    tracing::trace!(key, "Cache hit");
                    Some(value)
                }
                Err(err) => {
                    tracing::warn!(key, error = %err, "Cache deserialization failed");
                    None
                }
            },
            _ => None,
        }
    }

    async fn store<T>(&self, key: &str, value: &T)
    where
        T: serde::Serialize + ?Sized,
    {
        if let Ok(bytes) = serialize(value) {
            if let Err(err) = self.cache.set(key, &bytes, Some(self.ttl)).await {
                tracing::warn!(key, error = %err, "Failed to populate cache");
            }
        }
    }

    async fn invalidate_fund(&self, fund_id: Uuid) {
        if let Err(err) = self.cache.delete(&fund_key(fund_id)).await {
            tracing::warn!(fund_id = %fund_id, error = %err, "Failed to invalidate fund cache");
        }
        self.invalidate_ledger(fund_id).await;
    }

    async fn invalidate_ledger(&self, fund_id: Uuid) {
        if let Err(err) = self.cache.delete_pattern(&fund_pattern(fund_id)).await {
            tracing::warn!(
                fund_id = %fund_id,
                error = %err,
                "Failed to invalidate fund allocations cache"
            );
        }
    }

    /// Funds whose cached allocations an update makes stale, deletions included.
    async fn touched_funds(&self, update: &LedgerUpdate) -> Result<BTreeSet<Uuid>> {
        let mut funds: BTreeSet<Uuid> = update.fund_ids().into_iter().collect();
        for id in &update.delete_allocations {
            if let Some(allocation) = self.repository.get_allocation(*id).await? {
                funds.insert(allocation.fund_id);
            }
        }
        for id in &update.delete_capital_calls {
            if let Some(call) = self.repository.get_capital_call(*id).await? {
                funds.insert(call.fund_id);
            }
        }
        Ok(funds)
    }
}

#[async_trait]
impl<R, C> FundRepository for CachedFundRepository<R, C>
where
    R: FundRepository + 'static,
    C: Cache + 'static,
{
    async fn get_fund(&self, id: Uuid) -> Result<Option<Fund>> {
        let cache_key = fund_key(id);
        if let Some(fund) = self.cached::<Fund>(&cache_key).await {
            return Ok(Some(fund));
        }

        let fund = self.repository.get_fund(id).await?;
        if let Some(ref f) = fund {
            self.store(&cache_key, f).await;
        }
        Ok(fund)
    }

    async fn list_funds(&self) -> Result<Vec<Fund>> {
        self.repository.list_funds().await
    }

    async fn create_fund(&self, fund: &Fund) -> Result<()> {
        self.repository.create_fund(fund).await?;
        self.store(&fund_key(fund.id), fund).await;

        tracing::debug!(fund_id = %fund.id, name = %fund.name, "Fund created");
        Ok(())
    }

    async fn update_fund(&self, fund: &Fund) -> Result<()> {
        self.repository.update_fund(fund).await?;
        self.invalidate_fund(fund.id).await;

        tracing::debug!(fund_id = %fund.id, name = %fund.name, "Fund updated");
        Ok(())
    }

    async fn delete_fund(&self, id: Uuid) -> Result<()> {
        self.repository.delete_fund(id).await?;
        self.invalidate_fund(id).await;

        tracing::debug!(fund_id = %id, "Fund deleted");
        Ok(())
    }

    async fn get_allocation(&self, id: Uuid) -> Result<Option<FundAllocation>> {
        self.repository.get_allocation(id).await
    }

    async fn list_allocations_by_fund(&self, fund_id: Uuid) -> Result<Vec<FundAllocation>> {
        let cache_key = fund_allocations_key(fund_id);
        if let Some(allocations) = self.cached::<Vec<FundAllocation>>(&cache_key).await {
            return Ok(allocations);
        }

        let allocations = self.repository.list_allocations_by_fund(fund_id).await?;
        self.store(&cache_key, allocations.as_slice()).await;
        Ok(allocations)
    }

    async fn list_allocations_by_deal(&self, deal_id: Uuid) -> Result<Vec<FundAllocation>> {
        self.repository.list_allocations_by_deal(deal_id).await
    }

    async fn list_all_allocations(&self) -> Result<Vec<FundAllocation>> {
        self.repository.list_all_allocations().await
    }

    async fn get_capital_call(&self, id: Uuid) -> Result<Option<CapitalCall>> {
        self.repository.get_capital_call(id).await
    }

    async fn list_capital_calls_by_allocation(
        &self,
        allocation_id: Uuid,
    ) -> Result<Vec<CapitalCall>> {
        self.repository
            .list_capital_calls_by_allocation(allocation_id)
            .await
    }

    async fn list_capital_calls_by_fund(&self, fund_id: Uuid) -> Result<Vec<CapitalCall>> {
        self.repository.list_capital_calls_by_fund(fund_id).await
    }

    async fn list_all_capital_calls(&self) -> Result<Vec<CapitalCall>> {
        self.repository.list_all_capital_calls().await
    }

    async fn apply_ledger_update(&self, update: &LedgerUpdate) -> Result<()> {
        let funds = self.touched_funds(update).await?;
        self.repository.apply_ledger_update(update).await?;

        for fund_id in &funds {
            self.invalidate_ledger(*fund_id).await;
        }

        tracing::debug!(
            funds = funds.len(),
            allocations = update.upsert_allocations.len(),
            calls = update.upsert_capital_calls.len(),
            "Ledger update applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    use crate::storage::cached::test_cache::MockCache;
    use crate::storage::inmemory::InMemoryRepository;
    use dealflow_core::deal::Deal;
    use dealflow_core::storage::DealRepository;

    /// Counts allocation listings that reach the real repository.
    struct CountingRepository {
        inner: InMemoryRepository,
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl FundRepository for CountingRepository {
        async fn get_fund(&self, id: Uuid) -> Result<Option<Fund>> {
            self.inner.get_fund(id).await
        }
        async fn list_funds(&self) -> Result<Vec<Fund>> {
            self.inner.list_funds().await
        }
        async fn create_fund(&self, fund: &Fund) -> Result<()> {
            self.inner.create_fund(fund).await
        }
        async fn update_fund(&self, fund: &Fund) -> Result<()> {
            self.inner.update_fund(fund).await
        }
        async fn delete_fund(&self, id: Uuid) -> Result<()> {
            self.inner.delete_fund(id).await
        }
        async fn get_allocation(&self, id: Uuid) -> Result<Option<FundAllocation>> {
            self.inner.get_allocation(id).await
        }
        async fn list_allocations_by_fund(&self, fund_id: Uuid) -> Result<Vec<FundAllocation>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_allocations_by_fund(fund_id).await
        }
        async fn list_allocations_by_deal(&self, deal_id: Uuid) -> Result<Vec<FundAllocation>> {
            self.inner.list_allocations_by_deal(deal_id).await
        }
        async fn list_all_allocations(&self) -> Result<Vec<FundAllocation>> {
            self.inner.list_all_allocations().await
        }
        async fn get_capital_call(&self, id: Uuid) -> Result<Option<CapitalCall>> {
            self.inner.get_capital_call(id).await
        }
        async fn list_capital_calls_by_allocation(&self, id: Uuid) -> Result<Vec<CapitalCall>> {
            self.inner.list_capital_calls_by_allocation(id).await
        }
        async fn list_capital_calls_by_fund(&self, fund_id: Uuid) -> Result<Vec<CapitalCall>> {
            self.inner.list_capital_calls_by_fund(fund_id).await
        }
        async fn list_all_capital_calls(&self) -> Result<Vec<CapitalCall>> {
            self.inner.list_all_capital_calls().await
        }
        async fn apply_ledger_update(&self, update: &LedgerUpdate) -> Result<()> {
            self.inner.apply_ledger_update(update).await
        }
    }

    async fn setup() -> (
        Arc<CountingRepository>,
        Arc<MockCache>,
        CachedFundRepository<CountingRepository, MockCache>,
        Fund,
        Deal,
    ) {
        let inner = InMemoryRepository::new();
        let deal = Deal::new("Acme", Uuid::new_v4());
        inner.create_deal(&deal).await.unwrap();

        let repo = Arc::new(CountingRepository {
            inner,
            list_calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(MockCache::new());
        let cached = CachedFundRepository::new(repo.clone(), cache.clone(), Duration::from_secs(60));

        let fund = Fund::new("Fund I").with_target_size(1_000_000);
        cached.create_fund(&fund).await.unwrap();
        (repo, cache, cached, fund, deal)
    }

    fn allocation(fund: &Fund, deal: &Deal, amount: i64) -> FundAllocation {
        FundAllocation::new(
            fund.id,
            deal.id,
            amount,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_allocation_list_is_cached() {
        let (repo, cache, cached, fund, _) = setup().await;

        cached.list_allocations_by_fund(fund.id).await.unwrap();
        cached.list_allocations_by_fund(fund.id).await.unwrap();

        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 1);
        assert!(cache
            .store
            .read()
            .await
            .contains_key(&fund_allocations_key(fund.id)));
    }

    #[tokio::test]
    async fn test_ledger_update_invalidates_allocations_but_keeps_fund() {
        let (repo, cache, cached, fund, deal) = setup().await;
        cached.list_allocations_by_fund(fund.id).await.unwrap();

        cached
            .apply_ledger_update(&LedgerUpdate {
                upsert_allocations: vec![allocation(&fund, &deal, 500)],
                ..Default::default()
            })
            .await
            .unwrap();

        let store = cache.store.read().await;
        assert!(!store.contains_key(&fund_allocations_key(fund.id)));
        assert!(store.contains_key(&fund_key(fund.id)));
        drop(store);

        let fresh = cached.list_allocations_by_fund(fund.id).await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_deleting_allocation_invalidates_its_fund() {
        let (_, cache, cached, fund, deal) = setup().await;
        let alloc = allocation(&fund, &deal, 500);
        cached
            .apply_ledger_update(&LedgerUpdate {
                upsert_allocations: vec![alloc.clone()],
                ..Default::default()
            })
            .await
            .unwrap();
        cached.list_allocations_by_fund(fund.id).await.unwrap();

        cached
            .apply_ledger_update(&LedgerUpdate {
                delete_allocations: vec![alloc.id],
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!cache
            .store
            .read()
            .await
            .contains_key(&fund_allocations_key(fund.id)));
        assert!(cached
            .list_allocations_by_fund(fund.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_fund_invalidates_metadata() {
        let (_, cache, cached, mut fund, _) = setup().await;
        assert!(cache.store.read().await.contains_key(&fund_key(fund.id)));

        fund.name = "Fund I (renamed)".to_string();
        cached.update_fund(&fund).await.unwrap();
        assert!(!cache.store.read().await.contains_key(&fund_key(fund.id)));

        let loaded = cached.get_fund(fund.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Fund I (renamed)");
    }
}
