//! Borrow request transition table
//!
//! | From     | Action  | Role     | To        |
//! |----------|---------|----------|-----------|
//! | PENDING  | approve | lender   | APPROVED  |
//! | PENDING  | reject  | lender   | REJECTED  |
//! | PENDING  | cancel  | borrower | (removed) |
//! | APPROVED | return  | lender   | RETURNED  |
//! | RETURNED | confirm | borrower | COMPLETED |
//!
//! The backend is the authority; this table only decides which affordances
//! are offered and what the optimistic prediction looks like.

use crate::error::{AppError, AppResult};
use crate::models::enums::{RequestAction, RequestStatus, ViewRole};

/// Outcome of a valid action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(RequestStatus),
    /// The request disappears (cancellation)
    Removed,
}

/// Role entitled to perform `action`
pub fn actor(action: RequestAction) -> ViewRole {
    match action {
        RequestAction::Approve | RequestAction::Reject | RequestAction::Return => ViewRole::Lender,
        RequestAction::Confirm | RequestAction::Cancel => ViewRole::Borrower,
    }
}

/// Result of applying `action` to a request in `status`, if valid
pub fn transition(status: RequestStatus, action: RequestAction) -> Option<Transition> {
    use RequestAction::*;
    use RequestStatus::*;

    match (status, action) {
        (Pending, Approve) => Some(Transition::To(Approved)),
        (Pending, Reject) => Some(Transition::To(Rejected)),
        (Pending, Cancel) => Some(Transition::Removed),
        (Approved, Return) => Some(Transition::To(Returned)),
        (Returned, Confirm) => Some(Transition::To(Completed)),
        _ => None,
    }
}

/// Actions offered to `role` for a request in `status`
pub fn allowed_actions(status: RequestStatus, role: ViewRole) -> &'static [RequestAction] {
    use RequestAction::*;
    use RequestStatus::*;

    match (role, status) {
        (ViewRole::Lender, Pending) => &[Approve, Reject],
        (ViewRole::Lender, Approved) => &[Return],
        (ViewRole::Borrower, Pending) => &[Cancel],
        (ViewRole::Borrower, Returned) => &[Confirm],
        _ => &[],
    }
}

pub fn is_allowed(status: RequestStatus, role: ViewRole, action: RequestAction) -> bool {
    allowed_actions(status, role).contains(&action)
}

/// Validate an action and return its transition
pub fn check(status: RequestStatus, role: ViewRole, action: RequestAction) -> AppResult<Transition> {
    if actor(action) != role {
        return Err(AppError::InvalidTransition(format!(
            "Only the {} can {} a request",
            match actor(action) {
                ViewRole::Borrower => "borrower",
                ViewRole::Lender => "lender",
            },
            action
        )));
    }
    transition(status, action).ok_or_else(|| {
        AppError::InvalidTransition(format!(
            "Cannot {} a request that is {}",
            action,
            status.as_str().to_lowercase()
        ))
    })
}

/// Approve and reject collect an optional response message first
pub fn requires_response_dialog(action: RequestAction) -> bool {
    matches!(action, RequestAction::Approve | RequestAction::Reject)
}

/// Cancel is destructive and needs an explicit confirmation
pub fn requires_confirmation(action: RequestAction) -> bool {
    action == RequestAction::Cancel
}
