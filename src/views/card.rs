//! Compact list entry. Never carries contact details.

use std::fmt;

use super::{format_date, ActionButton, StatusBadge};
use crate::models::{BorrowRequest, RequestAction, ViewRole};
use crate::workflow::allowed_actions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCard {
    pub id: i64,
    pub item_title: String,
    pub badge: StatusBadge,
    /// "Lender" in the sent view, "Borrower" in the received view
    pub counterpart_label: &'static str,
    pub counterpart_name: String,
    pub borrow_date: String,
    pub return_date: String,
    pub request_message: Option<String>,
    pub actions: Vec<ActionButton>,
}

impl RequestCard {
    pub fn new(request: &BorrowRequest, role: ViewRole, in_flight: Option<RequestAction>) -> Self {
        Self {
            id: request.id,
            item_title: request.item.title.clone(),
            badge: StatusBadge::new(request.status),
            counterpart_label: counterpart_label(role),
            counterpart_name: request.counterpart(role).display_name().to_string(),
            borrow_date: format_date(request.borrow_date),
            return_date: format_date(request.return_date),
            request_message: request.request_message.clone(),
            actions: ActionButton::for_actions(allowed_actions(request.status, role), in_flight),
        }
    }
}

pub(crate) fn counterpart_label(role: ViewRole) -> &'static str {
    match role {
        ViewRole::Borrower => "Lender",
        ViewRole::Lender => "Borrower",
    }
}

impl fmt::Display for RequestCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#{:<5} {} {}", self.id, self.badge, self.item_title)?;
        writeln!(f, "       {}: {}", self.counterpart_label, self.counterpart_name)?;
        write!(f, "       {} - {}", self.borrow_date, self.return_date)?;
        if let Some(message) = &self.request_message {
            write!(f, "\n       \"{}\"", message)?;
        }
        if !self.actions.is_empty() {
            let labels: Vec<String> = self
                .actions
                .iter()
                .map(|b| format!("[{}]", b.label))
                .collect();
            write!(f, "\n       {}", labels.join(" "))?;
        }
        Ok(())
    }
}
