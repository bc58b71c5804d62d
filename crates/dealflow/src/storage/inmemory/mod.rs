//! In-memory storage backend.
//!
//! Implements every repository trait over `HashMap`s behind
//! `tokio::sync::RwLock`. Nothing is persisted; this is the default backend
//! for development and the backend used by handler tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use dealflow::storage::inmemory::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! ```

mod repository;

pub use repository::InMemoryRepository;
