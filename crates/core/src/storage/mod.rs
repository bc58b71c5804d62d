mod error;
mod http_mapping;
mod traits;
mod types;

pub use error::{DateRangeError, RepositoryError, Result};
pub use http_mapping::repository_error_to_status_code;
pub use traits::{
    AssignmentRepository, DealRepository, DocumentRepository, FundRepository, MemoRepository,
    NotificationRepository, StarRepository, TimelineRepository, UserRepository,
};
pub use types::DateRange;
