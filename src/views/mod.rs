//! Presentation contracts for borrow requests
//!
//! Plain data derived from a `BorrowRequest`, ready to be printed or handed
//! to any front end. Nothing here talks to the network.

pub mod badge;
pub mod card;
pub mod detail;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::RequestAction;

pub use badge::{BadgeTone, StatusBadge};
pub use card::RequestCard;
pub use detail::{ContactDetails, RequestDetail};

/// `Mar 5, 2025`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// `March 5, 2025`
pub fn format_date_long(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// `Mar 5, 2025 3:07 PM`
pub fn format_date_time(at: NaiveDateTime) -> String {
    at.format("%b %-d, %Y %-I:%M %p").to_string()
}

/// One action affordance on a card or detail view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub action: RequestAction,
    pub label: &'static str,
    /// Another action on the same request is running
    pub disabled: bool,
}

impl ActionButton {
    /// `in_flight` is the action currently running on the request, if any
    pub fn new(action: RequestAction, in_flight: Option<RequestAction>) -> Self {
        let busy = in_flight == Some(action);
        Self {
            action,
            label: if busy { busy_label(action) } else { idle_label(action) },
            disabled: in_flight.is_some(),
        }
    }

    pub fn for_actions(actions: &[RequestAction], in_flight: Option<RequestAction>) -> Vec<Self> {
        actions.iter().map(|a| Self::new(*a, in_flight)).collect()
    }
}

fn idle_label(action: RequestAction) -> &'static str {
    match action {
        RequestAction::Approve => "Approve",
        RequestAction::Reject => "Reject",
        RequestAction::Return => "Mark as Returned",
        RequestAction::Confirm => "Confirm Return",
        RequestAction::Cancel => "Cancel",
    }
}

fn busy_label(action: RequestAction) -> &'static str {
    match action {
        RequestAction::Approve => "Approving...",
        RequestAction::Reject => "Rejecting...",
        RequestAction::Return => "Processing...",
        RequestAction::Confirm => "Confirming...",
        RequestAction::Cancel => "Canceling...",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_formats() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(format_date(date), "Mar 5, 2025");
        assert_eq!(format_date_long(date), "March 5, 2025");
        assert_eq!(format_date_time(date.and_hms_opt(15, 7, 0).unwrap()), "Mar 5, 2025 3:07 PM");
        assert_eq!(format_date_time(date.and_hms_opt(0, 30, 0).unwrap()), "Mar 5, 2025 12:30 AM");
    }

    #[test]
    fn test_button_labels_follow_progress() {
        let idle = ActionButton::for_actions(&[RequestAction::Approve, RequestAction::Reject], None);
        assert_eq!(idle[0].label, "Approve");
        assert!(idle.iter().all(|b| !b.disabled));

        let busy = ActionButton::for_actions(
            &[RequestAction::Approve, RequestAction::Reject],
            Some(RequestAction::Reject),
        );
        assert_eq!(busy[0].label, "Approve");
        assert_eq!(busy[1].label, "Rejecting...");
        assert!(busy.iter().all(|b| b.disabled));

        assert_eq!(ActionButton::new(RequestAction::Return, None).label, "Mark as Returned");
        assert_eq!(
            ActionButton::new(RequestAction::Cancel, Some(RequestAction::Cancel)).label,
            "Canceling..."
        );
    }
}
