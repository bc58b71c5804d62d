//! Functional core of dealflow.
//!
//! Domain types, request payloads, validation, and the pure financial
//! logic behind funds, allocations and capital calls. Nothing in this crate
//! performs I/O; storage and caching are expressed as traits that the server
//! implements.

pub mod auth;
pub mod cache;
pub mod dashboard;
pub mod deal;
pub mod document;
pub mod fund;
pub mod leaderboard;
pub mod notification;
pub mod serde;
pub mod storage;
pub mod user;
