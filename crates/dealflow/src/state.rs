//! Application state with repository-based storage.
//!
//! This module defines the shared application state that is passed to all
//! request handlers. It uses repository trait objects for storage abstraction
//! and supports different backend combinations via feature flags.

use std::sync::Arc;

use dealflow_auth::{AuthConfig, AuthState};
use dealflow_core::auth::SessionRepository;
use dealflow_core::storage::{
    AssignmentRepository, DealRepository, DocumentRepository, FundRepository, MemoRepository,
    NotificationRepository, StarRepository, TimelineRepository, UserRepository,
};

use crate::config::Config;
use crate::ledger::FundLedger;
use crate::metrics::Metrics;
use crate::rate_limit::RateLimiter;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub deals: Arc<dyn DealRepository>,
    pub timeline: Arc<dyn TimelineRepository>,
    pub stars: Arc<dyn StarRepository>,
    pub memos: Arc<dyn MemoRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub funds: Arc<dyn FundRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    /// Every allocation and capital call write goes through here.
    pub ledger: Arc<FundLedger>,
    pub auth: AuthState,
    pub metrics: Arc<Metrics>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Config,
}

impl AsRef<AuthState> for AppState {
    fn as_ref(&self) -> &AuthState {
        &self.auth
    }
}

/// Repositories that are not wrapped by a cache decorator.
trait BaseRepository:
    UserRepository
    + TimelineRepository
    + StarRepository
    + MemoRepository
    + AssignmentRepository
    + DocumentRepository
    + NotificationRepository
{
}

impl<T> BaseRepository for T where
    T: UserRepository
        + TimelineRepository
        + StarRepository
        + MemoRepository
        + AssignmentRepository
        + DocumentRepository
        + NotificationRepository
{
}

impl AppState {
    /// Internal constructor used by the factory functions.
    fn build<R>(
        base: Arc<R>,
        deals: Arc<dyn DealRepository>,
        funds: Arc<dyn FundRepository>,
        sessions: Arc<dyn SessionRepository>,
        auth_config: AuthConfig,
        config: &Config,
    ) -> Self
    where
        R: BaseRepository + 'static,
    {
        let users: Arc<dyn UserRepository> = base.clone();
        let timeline: Arc<dyn TimelineRepository> = base.clone();
        let notifications: Arc<dyn NotificationRepository> = base.clone();

        let ledger = Arc::new(FundLedger::new(
            funds.clone(),
            deals.clone(),
            timeline.clone(),
            notifications.clone(),
            users.clone(),
        ));

        Self {
            auth: AuthState::new(sessions, users.clone(), auth_config),
            users,
            deals,
            timeline,
            stars: base.clone(),
            memos: base.clone(),
            assignments: base.clone(),
            funds,
            documents: base,
            notifications,
            ledger,
            metrics: Arc::new(Metrics::new()),
            rate_limiter: Arc::new(RateLimiter::new(
                config.rate_limit_burst,
                config.rate_limit_per_second,
            )),
            config: config.clone(),
        }
    }
}

// ============================================================================
// Factory functions for different backend combinations
// ============================================================================

#[cfg(all(feature = "sqlite", feature = "memory"))]
mod sqlite_memory {
    use super::*;
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    use dealflow_auth::SqliteSessionStore;

    use crate::cache::memory::MemoryCache;
    use crate::storage::cached::{CachedDealRepository, CachedFundRepository};
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage and in-memory cache.
        ///
        /// Sessions live in the same database file, managed through `sqlx`.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let sqlite_repo = Arc::new(SqliteRepository::new(&config.sqlite_path).await?);
            let memory_cache = Arc::new(MemoryCache::new(config.cache_max_entries));

            let cached_deal_repo = Arc::new(CachedDealRepository::new(
                sqlite_repo.clone(),
                memory_cache.clone(),
                config.cache_ttl(),
            ));

            let cached_fund_repo = Arc::new(CachedFundRepository::new(
                sqlite_repo.clone(),
                memory_cache,
                config.cache_ttl(),
            ));

            let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.sqlite_path))?
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?;
            let sessions = SqliteSessionStore::new(pool);
            sessions.migrate().await?;

            tracing::info!(path = %config.sqlite_path, "Using SQLite storage");

            Ok(Self::build(
                sqlite_repo,
                cached_deal_repo,
                cached_fund_repo,
                Arc::new(sessions),
                AuthConfig::from_env(),
                config,
            ))
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "memory"))]
mod inmemory_memory {
    use super::*;

    use dealflow_auth::InMemorySessionStore;

    use crate::cache::memory::MemoryCache;
    use crate::storage::cached::{CachedDealRepository, CachedFundRepository};
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage and cache.
        /// Nothing survives a restart.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let inmemory_repo = Arc::new(InMemoryRepository::new());
            let memory_cache = Arc::new(MemoryCache::new(config.cache_max_entries));

            let cached_deal_repo = Arc::new(CachedDealRepository::new(
                inmemory_repo.clone(),
                memory_cache.clone(),
                config.cache_ttl(),
            ));

            let cached_fund_repo = Arc::new(CachedFundRepository::new(
                inmemory_repo.clone(),
                memory_cache,
                config.cache_ttl(),
            ));

            tracing::info!("Using in-memory storage");

            Ok(Self::build(
                inmemory_repo,
                cached_deal_repo,
                cached_fund_repo,
                Arc::new(InMemorySessionStore::new()),
                AuthConfig::from_env(),
                config,
            ))
        }
    }
}

// ============================================================================
// Test support - provides Default implementation for unit tests
// ============================================================================

#[cfg(test)]
mod test_support {
    use super::*;

    use dealflow_auth::InMemorySessionStore;

    use crate::storage::InMemoryRepository;

    /// Configuration for tests: nothing read from the environment, a
    /// generous rate limit and a small upload limit.
    pub fn test_config() -> Config {
        Config {
            cache_ttl_seconds: 60,
            cache_max_entries: 1_000,
            sqlite_path: ":memory:".to_string(),
            rate_limit_burst: 10_000,
            rate_limit_per_second: 10_000,
            max_document_bytes: 1024,
            request_timeout_seconds: 5,
            admin_username: "admin".to_string(),
            admin_password: None,
        }
    }

    impl AppState {
        /// Creates an AppState over one uncached in-memory repository.
        pub fn for_tests(config: &Config) -> Self {
            let repo = Arc::new(InMemoryRepository::new());
            let auth_config = AuthConfig {
                cookie_secure: false,
                ..AuthConfig::default()
            };
            Self::build(
                repo.clone(),
                repo.clone(),
                repo,
                Arc::new(InMemorySessionStore::new()),
                auth_config,
                config,
            )
        }
    }

    impl Default for AppState {
        /// Creates an AppState with in-memory storage for testing.
        ///
        /// This is only available in test builds and provides a simple way
        /// to create an AppState without external dependencies.
        fn default() -> Self {
            Self::for_tests(&test_config())
        }
    }
}

#[cfg(test)]
pub use test_support::test_config;
