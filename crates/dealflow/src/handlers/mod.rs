pub mod allocations;
pub mod authz;
pub mod capital_calls;
pub mod deals;
pub mod documents;
pub mod error;
pub mod funds;
pub mod health;
pub mod insights;
pub mod memos;
pub mod notifications;
pub mod users;

pub use error::AppError;
