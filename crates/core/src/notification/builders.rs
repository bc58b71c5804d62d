//! Constructors for the notifications raised by pipeline and fund activity.

use uuid::Uuid;

use super::types::{Notification, NotificationKind};
use crate::deal::{Deal, DealStage};
use crate::fund::CapitalCall;

/// Format cents as a currency amount, e.g. `USD 1,234.50`.
pub fn format_money(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{currency} {sign}{grouped}.{:02}", abs % 100)
}

pub fn deal_assigned(assignee: Uuid, deal: &Deal, assigned_by_name: &str) -> Notification {
    Notification::new(
        assignee,
        NotificationKind::DealAssigned,
        format!("Assigned to {}", deal.name),
        format!("{assigned_by_name} assigned you to {}", deal.name),
    )
    .for_deal(deal.id)
}

pub fn stage_changed(
    recipient: Uuid,
    deal: &Deal,
    from: DealStage,
    to: DealStage,
) -> Notification {
    Notification::new(
        recipient,
        NotificationKind::StageChanged,
        format!("{} moved to {}", deal.name, to.label()),
        format!("{} moved from {} to {}", deal.name, from.label(), to.label()),
    )
    .for_deal(deal.id)
}

pub fn memo_comment(
    memo_author: Uuid,
    deal: &Deal,
    commenter_name: &str,
    excerpt: &str,
) -> Notification {
    let excerpt: String = excerpt.chars().take(120).collect();
    Notification::new(
        memo_author,
        NotificationKind::MemoComment,
        format!("New comment on your {} memo", deal.name),
        format!("{commenter_name}: {excerpt}"),
    )
    .for_deal(deal.id)
}

pub fn capital_call_issued(
    recipient: Uuid,
    deal: &Deal,
    call: &CapitalCall,
    currency: &str,
) -> Notification {
    Notification::new(
        recipient,
        NotificationKind::CapitalCall,
        format!("Capital call #{} for {}", call.call_number, deal.name),
        format!(
            "{} due {}",
            format_money(call.call_amount, currency),
            call.due_date
        ),
    )
    .for_deal(deal.id)
}

pub fn payment_recorded(
    recipient: Uuid,
    deal: &Deal,
    call: &CapitalCall,
    amount: i64,
    currency: &str,
) -> Notification {
    Notification::new(
        recipient,
        NotificationKind::PaymentRecorded,
        format!("Payment received for {}", deal.name),
        format!(
            "{} received against capital call #{} ({} of {} paid)",
            format_money(amount, currency),
            call.call_number,
            format_money(call.paid_amount, currency),
            format_money(call.call_amount, currency),
        ),
    )
    .for_deal(deal.id)
}

pub fn system(recipient: Uuid, title: &str, message: &str) -> Notification {
    Notification::new(recipient, NotificationKind::System, title, message)
}
