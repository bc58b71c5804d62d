mod error;
mod operations;
mod requests;
mod types;

pub use error::{DealError, MemoError};
pub use operations::{
    average_memo_score, change_stage, creation_event, filter_deals, sort_deals_by_recent,
    summarize_deal, validate_comment, validate_deal, validate_memo, validate_memo_score,
    validate_note, DealSummary,
};
pub use requests::{
    AssignUserRequest, ChangeStageRequest, CreateCommentRequest, CreateDealRequest,
    CreateMemoRequest, CreateNoteRequest, DealFilter, UpdateDealRequest, UpdateMemoRequest,
};
pub use types::{
    Deal, DealAssignment, DealStage, DealStar, MemoComment, MiniMemo, TimelineEvent,
    TimelineEventType,
};
