//! Cached deal repository decorator.
//!
//! Wraps a `DealRepository` implementation with cache-aside pattern.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use dealflow_core::cache::{deal_key, deserialize, serialize, Cache};
use dealflow_core::deal::Deal;
use dealflow_core::storage::{DealRepository, Result};

/// Cached deal repository decorator.
///
/// Only single-deal reads are cached; listings always go to the repository
/// because their ordering depends on every deal's `updated_at`.
///
/// # Type Parameters
///
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation
pub struct CachedDealRepository<R, C>
where
    R: DealRepository,
    C: Cache,
{
    repository: Arc<R>,
    cache: Arc<C>,
    ttl: Duration,
}

impl<R, C> CachedDealRepository<R, C>
where
    R: DealRepository,
    C: Cache,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            ttl,
        }
    }

    async fn invalidate(&self, id: Uuid) {
        if let Err(err) = self.cache.delete(&deal_key(id)).await {
            tracing::warn!(deal_id = %id, error = %err, "Failed to invalidate deal cache");
        }
    }
}

#[async_trait]
impl<R, C> DealRepository for CachedDealRepository<R, C>
where
    R: DealRepository + 'static,
    C: Cache + 'static,
{
    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>> {
        let cache_key = deal_key(id);

        if let Ok(Some(bytes)) = self.cache.get(&cache_key).await {
            if let Ok(deal) = deserialize::<Deal>(&bytes) {
                tracing::trace!(deal_id = %id, "Cache hit for deal");
                return Ok(Some(deal));
            }
            tracing::warn!(deal_id = %id, "Cache deal deserialization failed");
        }

        tracing::trace!(deal_id = %id, "Cache miss for deal");
        let deal = self.repository.get_deal(id).await?;

        if let Some(ref d) = deal {
            if let Ok(bytes) = serialize(d) {
                if let Err(err) = self.cache.set(&cache_key, &bytes, Some(self.ttl)).await {
                    tracing::warn!(deal_id = %id, error = %err, "Failed to cache deal");
                }
            }
        }

        Ok(deal)
    }

    async fn list_deals(&self) -> Result<Vec<Deal>> {
        self.repository.list_deals().await
    }

    async fn create_deal(&self, deal: &Deal) -> Result<()> {
        self.repository.create_deal(deal).await?;

        if let Ok(bytes) = serialize(deal) {
            if let Err(err) = self
                .cache
                .set(&deal_key(deal.id), &bytes, Some(self.ttl))
                .await
            {
                tracing::warn!(deal_id = %deal.id, error = %err, "Failed to cache new deal");
            }
        }

        tracing::debug!(deal_id = %deal.id, name = %deal.name, "Deal created");
        Ok(())
    }

    async fn update_deal(&self, deal: &Deal) -> Result<()> {
        self.repository.update_deal(deal).await?;
        self.invalidate(deal.id).await;

        tracing::debug!(deal_id = %deal.id, stage = %deal.stage, "Deal updated");
        Ok(())
    }

    async fn delete_deal(&self, id: Uuid) -> Result<()> {
        self.repository.delete_deal(id).await?;
        self.invalidate(id).await;

        tracing::debug!(deal_id = %id, "Deal deleted");
        Ok(())
    }
}
