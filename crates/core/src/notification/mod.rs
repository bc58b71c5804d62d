pub mod builders;
mod types;

pub use builders::format_money;
pub use types::{Notification, NotificationKind, NotificationQuery, UnreadCount};
