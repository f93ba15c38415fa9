//! Optimistic view updates
//!
//! `apply` predicts what the list looks like once the backend accepts an
//! action, `reconcile` swaps the prediction for the server's copy, and
//! `rollback` puts the pre-action snapshot back untouched. Outcomes the
//! server confirmed after a snapshot was taken are put back with `replay`.

use chrono::NaiveDateTime;

use super::transition::{self, Transition};
use crate::error::{AppError, AppResult};
use crate::models::{
    BorrowRequest, RequestAction, RequestStatistics, RequestStatus, ResponsePayload, ViewRole,
};

/// State owned by one role view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub requests: Vec<BorrowRequest>,
    pub selected: Option<BorrowRequest>,
    pub statistics: Option<RequestStatistics>,
}

/// Pre-action copy of a `ViewState`
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(ViewState);

impl Snapshot {
    /// Position and copy of request `id` when the snapshot was taken
    pub fn locate(&self, id: i64) -> Option<(usize, &BorrowRequest)> {
        self.0.requests.iter().enumerate().find(|(_, r)| r.id == id)
    }
}

impl ViewState {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.clone())
    }

    pub fn find(&self, id: i64) -> Option<&BorrowRequest> {
        self.requests.iter().find(|r| r.id == id)
    }
}

/// Restore the full pre-action state
pub fn rollback(snapshot: Snapshot) -> ViewState {
    snapshot.0
}

/// Settled result of an action
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// Server copy after a successful action
    Updated(BorrowRequest),
    /// Successful cancel
    Removed(i64),
    /// Failed action: the request as it was before, at its list position
    Restored { position: usize, request: BorrowRequest },
}

/// Re-apply confirmed outcomes, oldest first, onto a restored snapshot
pub fn replay<'a>(state: &mut ViewState, settled: impl IntoIterator<Item = &'a Settled>) {
    for outcome in settled {
        match outcome {
            Settled::Updated(server) => splice(state, server.clone()),
            Settled::Removed(id) => remove(state, *id),
            Settled::Restored { position, request } => {
                if state.find(request.id).is_some() {
                    splice(state, request.clone());
                } else {
                    let at = (*position).min(state.requests.len());
                    state.requests.insert(at, request.clone());
                }
            }
        }
    }
}

/// Predicted post-action copy of `request`; `None` when the action removes it.
pub fn predict(
    request: &BorrowRequest,
    action: RequestAction,
    payload: &ResponsePayload,
    now: NaiveDateTime,
) -> Option<BorrowRequest> {
    let Some(Transition::To(status)) = transition::transition(request.status, action) else {
        return None;
    };

    let mut next = request.clone();
    next.status = status;
    next.updated_at = now;
    match action {
        RequestAction::Approve | RequestAction::Reject => {
            next.response_message = payload.response_message.clone();
        }
        RequestAction::Return => next.returned_at = Some(now),
        RequestAction::Confirm => next.completed_at = Some(now),
        RequestAction::Cancel => {}
    }
    Some(next)
}

/// Apply `action` on request `id` as the backend is expected to.
pub fn apply(
    state: &ViewState,
    role: ViewRole,
    action: RequestAction,
    id: i64,
    payload: &ResponsePayload,
    now: NaiveDateTime,
) -> AppResult<ViewState> {
    let current = state
        .find(id)
        .ok_or_else(|| AppError::NotFound(format!("Request {} is not in this list", id)))?;
    let outcome = transition::check(current.status, role, action)?;
    let from = current.status;

    let mut next = state.clone();
    match outcome {
        Transition::To(to) => {
            let predicted = predict(current, action, payload, now);
            if let Some(predicted) = predicted {
                splice(&mut next, predicted);
            }
            if let Some(stats) = next.statistics.as_mut() {
                adjust_statistics(stats, from, Some(to), role);
            }
        }
        Transition::Removed => {
            remove(&mut next, id);
            if let Some(stats) = next.statistics.as_mut() {
                adjust_statistics(stats, from, None, role);
            }
        }
    }
    Ok(next)
}

/// Move one request between status buckets, or drop it from `role`'s total
/// when `to` is `None`. Counts never go below zero.
pub fn adjust_statistics(
    stats: &mut RequestStatistics,
    from: RequestStatus,
    to: Option<RequestStatus>,
    role: ViewRole,
) {
    let old = stats.count_mut(from);
    *old = old.saturating_sub(1);
    match to {
        Some(to) => *stats.count_mut(to) += 1,
        None => {
            let total = stats.total_mut(role);
            *total = total.saturating_sub(1);
        }
    }
}

/// Replace the optimistic copy with the server's authoritative object
pub fn reconcile(state: &mut ViewState, server: BorrowRequest) {
    splice(state, server);
}

fn remove(state: &mut ViewState, id: i64) {
    state.requests.retain(|r| r.id != id);
    if state.selected.as_ref().is_some_and(|s| s.id == id) {
        state.selected = None;
    }
}

fn splice(state: &mut ViewState, request: BorrowRequest) {
    if let Some(slot) = state.requests.iter_mut().find(|r| r.id == request.id) {
        *slot = request.clone();
    }
    if let Some(selected) = state.selected.as_mut().filter(|s| s.id == request.id) {
        *selected = request;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::borrow_request::fixtures::{request, timestamp};

    fn state(requests: Vec<BorrowRequest>) -> ViewState {
        ViewState {
            selected: requests.first().cloned(),
            requests,
            statistics: Some(RequestStatistics {
                pending_count: 3,
                approved_count: 1,
                total_sent: 4,
                total_received: 4,
                ..Default::default()
            }),
        }
    }

    fn no_message() -> ResponsePayload {
        ResponsePayload::default()
    }

    #[test]
    fn test_approve_prediction_and_shadow() {
        let before = state(vec![request(7, RequestStatus::Pending)]);
        let now = timestamp(2, 12);
        let payload = ResponsePayload::new(Some("ok".to_string()));

        let after = apply(&before, ViewRole::Lender, RequestAction::Approve, 7, &payload, now).unwrap();

        let approved = after.find(7).unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.response_message.as_deref(), Some("ok"));
        assert_eq!(approved.updated_at, now);
        assert_eq!(after.selected.as_ref(), Some(approved));

        let stats = after.statistics.unwrap();
        assert_eq!(stats.pending_count, 2);
        assert_eq!(stats.approved_count, 2);
        assert_eq!(stats.total_received, 4);
    }

    #[test]
    fn test_apply_leaves_input_untouched() {
        let before = state(vec![request(7, RequestStatus::Pending)]);
        let copy = before.clone();
        let _ = apply(&before, ViewRole::Lender, RequestAction::Reject, 7, &no_message(), timestamp(2, 12));
        assert_eq!(before, copy);
    }

    #[test]
    fn test_return_and_confirm_set_timestamps() {
        let now = timestamp(8, 18);
        let before = state(vec![request(1, RequestStatus::Approved)]);
        let after = apply(&before, ViewRole::Lender, RequestAction::Return, 1, &no_message(), now).unwrap();
        let returned = after.find(1).unwrap();
        assert_eq!(returned.status, RequestStatus::Returned);
        assert_eq!(returned.returned_at, Some(now));
        assert_eq!(returned.completed_at, None);
        assert!(returned.timestamps_consistent());

        let before = state(vec![request(2, RequestStatus::Returned)]);
        let after = apply(&before, ViewRole::Borrower, RequestAction::Confirm, 2, &no_message(), now).unwrap();
        let completed = after.find(2).unwrap();
        assert_eq!(completed.status, RequestStatus::Completed);
        assert_eq!(completed.completed_at, Some(now));
        assert!(completed.timestamps_consistent());
    }

    #[test]
    fn test_cancel_removes_and_clears_selection() {
        let before = state(vec![request(42, RequestStatus::Pending), request(43, RequestStatus::Approved)]);
        let after = apply(&before, ViewRole::Borrower, RequestAction::Cancel, 42, &no_message(), timestamp(2, 9))
            .unwrap();

        assert!(after.find(42).is_none());
        assert_eq!(after.requests.len(), 1);
        assert_eq!(after.selected, None);
        let stats = after.statistics.unwrap();
        assert_eq!(stats.pending_count, 2);
        assert_eq!(stats.total_sent, 3);
    }

    #[test]
    fn test_rollback_restores_snapshot_exactly() {
        let before = state(vec![request(42, RequestStatus::Pending), request(9, RequestStatus::Returned)]);
        let snapshot = before.snapshot();
        let after = apply(&before, ViewRole::Borrower, RequestAction::Cancel, 42, &no_message(), timestamp(2, 9))
            .unwrap();
        assert_ne!(after, before);

        let restored = rollback(snapshot);
        assert_eq!(restored, before);
        assert_eq!(restored.find(42).unwrap().status, RequestStatus::Pending);
    }

    #[test]
    fn test_replay_restores_confirmed_outcomes_after_rollback() {
        let before = state(vec![
            request(7, RequestStatus::Pending),
            request(8, RequestStatus::Pending),
            request(9, RequestStatus::Pending),
        ]);
        let snapshot = before.snapshot();
        let mut rejected = request(8, RequestStatus::Rejected);
        rejected.response_message = Some("busy".to_string());
        let settled = vec![Settled::Updated(rejected.clone()), Settled::Removed(9)];

        let mut restored = rollback(snapshot);
        replay(&mut restored, &settled);

        assert_eq!(restored.find(7).unwrap().status, RequestStatus::Pending);
        assert_eq!(restored.find(8), Some(&rejected));
        assert!(restored.find(9).is_none());
        assert_eq!(restored.selected.as_ref().map(|s| s.id), Some(7));
    }

    #[test]
    fn test_replay_reinserts_restored_request() {
        let before = state(vec![request(1, RequestStatus::Pending), request(2, RequestStatus::Pending)]);
        let snapshot = before.snapshot();
        let (position, original) = snapshot.locate(2).unwrap();
        let restored = Settled::Restored {
            position,
            request: original.clone(),
        };

        let mut later = apply(&before, ViewRole::Borrower, RequestAction::Cancel, 2, &no_message(), timestamp(2, 9))
            .unwrap();
        replay(&mut later, [&restored]);
        assert_eq!(later.requests, before.requests);

        replay(&mut later, [&restored]);
        assert_eq!(later.requests, before.requests);
    }

    #[test]
    fn test_reconcile_prefers_server_copy() {
        let before = state(vec![request(7, RequestStatus::Pending)]);
        let mut after = apply(
            &before,
            ViewRole::Lender,
            RequestAction::Approve,
            7,
            &ResponsePayload::new(Some("ok".to_string())),
            timestamp(2, 12),
        )
        .unwrap();

        let mut server = request(7, RequestStatus::Approved);
        server.response_message = Some("ok".to_string());
        server.updated_at = timestamp(2, 13);
        reconcile(&mut after, server.clone());

        assert_eq!(after.requests, vec![server.clone()]);
        assert_eq!(after.selected, Some(server));
        assert!(after.requests.iter().all(|r| r.status != RequestStatus::Pending));
    }

    #[test]
    fn test_rejects_unknown_id_and_invalid_action() {
        let before = state(vec![request(7, RequestStatus::Completed)]);
        let err = apply(&before, ViewRole::Lender, RequestAction::Approve, 99, &no_message(), timestamp(2, 9))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = apply(&before, ViewRole::Borrower, RequestAction::Confirm, 7, &no_message(), timestamp(2, 9))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn test_shadow_floors_at_zero() {
        let mut stats = RequestStatistics::default();
        adjust_statistics(&mut stats, RequestStatus::Pending, None, ViewRole::Borrower);
        assert_eq!(stats, RequestStatistics::default());

        adjust_statistics(&mut stats, RequestStatus::Approved, Some(RequestStatus::Returned), ViewRole::Lender);
        assert_eq!(stats.approved_count, 0);
        assert_eq!(stats.returned_count, 1);
    }

    #[test]
    fn test_missing_statistics_stay_missing() {
        let mut before = state(vec![request(7, RequestStatus::Pending)]);
        before.statistics = None;
        let after = apply(&before, ViewRole::Lender, RequestAction::Reject, 7, &no_message(), timestamp(2, 9))
            .unwrap();
        assert_eq!(after.statistics, None);
        assert_eq!(after.find(7).unwrap().status, RequestStatus::Rejected);
    }
}
