//! Cache backend implementations.
//!
//! Concrete implementations of the [`Cache`](dealflow_core::cache::Cache)
//! trait, selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process LRU cache with per-entry TTL

#[cfg(not(feature = "memory"))]
compile_error!(
    "No cache backend selected. Enable the 'memory' feature. \
    Example: cargo build -p dealflow --features memory"
);

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryCache;
