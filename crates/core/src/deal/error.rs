use thiserror::Error;

use super::DealStage;

/// Errors that can occur when validating or manipulating deals.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DealError {
    #[error("Deal name cannot be empty")]
    EmptyName,
    #[error("Deal name too long (max 200 characters)")]
    NameTooLong,
    #[error("{0} cannot be negative")]
    NegativeAmount(&'static str),
    #[error("Invalid contact email: {0}")]
    InvalidContactEmail(String),
    #[error("Deal is already in stage {0}")]
    StageUnchanged(DealStage),
    #[error("A reason is required to reject a deal")]
    MissingRejectionReason,
    #[error("Deal has fund allocations")]
    HasAllocations,
}

/// Errors that can occur when validating memos and comments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoError {
    #[error("Memo thesis cannot be empty")]
    EmptyThesis,
    #[error("Memo score must be between 1 and 10, got {0}")]
    ScoreOutOfRange(i64),
    #[error("Comment cannot be empty")]
    EmptyComment,
    #[error("Timeline note cannot be empty")]
    EmptyNote,
}
