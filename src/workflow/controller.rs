//! Borrow request workflow controller
//!
//! One controller exists per role view ("sent" for the borrower, "received"
//! for the lender). It owns its own copy of the list, selection and
//! statistics and applies actions optimistically, reconciling with or rolling
//! back to the server's answer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;
use validator::Validate;

use super::optimistic::{self, Settled, ViewState};
use super::transition;
use crate::{
    api::RequestsApi,
    error::{AppError, AppResult},
    models::{
        BorrowRequest, RequestAction, RequestStatistics, RequestStatus, ResponsePayload, StatusFilter,
        ViewRole,
    },
    services::notifications::{Notification, Notifier},
};

pub const RESPONSE_MESSAGE_MAX: usize = 500;

/// Dialog currently open in front of an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    /// Approve/reject: collects an optional response message
    Respond {
        action: RequestAction,
        request_id: i64,
        message: String,
    },
    /// Cancel: destructive, needs explicit confirmation
    ConfirmCancel { request_id: i64 },
}

impl Dialog {
    pub fn request_id(&self) -> i64 {
        match self {
            Dialog::Respond { request_id, .. } | Dialog::ConfirmCancel { request_id } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// A dialog was opened; submit it to dispatch the action
    DialogOpened,
    /// The backend accepted the action; `None` for cancellations
    Applied(Option<BorrowRequest>),
    /// The view was unmounted before the backend answered
    Abandoned,
}

/// Action awaiting the backend, kept so its prediction can be re-applied
#[derive(Debug, Clone)]
struct InFlight {
    action: RequestAction,
    payload: ResponsePayload,
    at: NaiveDateTime,
}

#[derive(Debug, Default)]
struct ControllerState {
    view: ViewState,
    filter: StatusFilter,
    dialog: Option<Dialog>,
    in_flight: HashMap<i64, InFlight>,
    /// Outcomes settled while other actions were in flight, by sequence
    settled: Vec<(u64, Settled)>,
    next_seq: u64,
    load_error: Option<String>,
    is_loading: bool,
}

impl ControllerState {
    /// Release `id`; the settled log is only needed while snapshots are live
    fn finish(&mut self, id: i64) {
        self.in_flight.remove(&id);
        if self.in_flight.is_empty() {
            self.settled.clear();
        }
    }

    fn record(&mut self, outcome: Settled) {
        if !self.in_flight.is_empty() {
            self.settled.push((self.next_seq, outcome));
        }
        self.next_seq += 1;
    }

    /// Put back predictions of actions still awaiting the backend.
    ///
    /// Predictions already present in `view` are refused by the transition
    /// table and skipped.
    fn reapply_in_flight(&self, view: ViewState, role: ViewRole) -> ViewState {
        self.in_flight.iter().fold(view, |view, (id, pending)| {
            optimistic::apply(&view, role, pending.action, *id, &pending.payload, pending.at).unwrap_or(view)
        })
    }

    /// Outcomes settled at or after `since`
    fn settled_since(&self, since: u64) -> Vec<Settled> {
        self.settled
            .iter()
            .filter(|(seq, _)| *seq >= since)
            .map(|(_, outcome)| outcome.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct RequestsController {
    role: ViewRole,
    api: Arc<dyn RequestsApi>,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<ControllerState>>,
    mounted: Arc<AtomicBool>,
}

impl RequestsController {
    pub fn new(role: ViewRole, api: Arc<dyn RequestsApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            role,
            api,
            notifier,
            state: Arc::new(Mutex::new(ControllerState::default())),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn role(&self) -> ViewRole {
        self.role
    }

    /// Initial load: list and statistics in parallel
    pub async fn mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
        tokio::join!(self.load_requests(), self.load_statistics());
    }

    /// Late completions after this are ignored
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        tracing::debug!(role = %self.role, "Requests view unmounted");
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Fetch the list for the current filter.
    ///
    /// On failure the existing list is kept and `load_error` is set. A
    /// response for a filter that is no longer selected is dropped.
    pub async fn load_requests(&self) {
        let filter = {
            let mut state = self.state.lock();
            state.is_loading = true;
            state.filter
        };

        let result = match self.role {
            ViewRole::Borrower => self.api.list_sent(filter.status()).await,
            ViewRole::Lender => self.api.list_received(filter.status()).await,
        };

        if !self.is_mounted() {
            return;
        }
        let mut state = self.state.lock();
        if state.filter != filter {
            tracing::debug!(role = %self.role, "Dropping stale {} list", filter);
            return;
        }
        state.is_loading = false;

        match result {
            Ok(requests) => {
                tracing::debug!(role = %self.role, "Loaded {} requests ({})", requests.len(), filter);
                let selected_id = state.view.selected.as_ref().map(|s| s.id);
                if let Some(fresh) = selected_id.and_then(|id| requests.iter().find(|r| r.id == id)) {
                    state.view.selected = Some(fresh.clone());
                }
                state.view.requests = requests;
                state.load_error = None;
            }
            Err(e) => {
                tracing::warn!(role = %self.role, "Failed to load requests: {}", e);
                state.load_error = Some(e.user_message());
            }
        }
    }

    pub async fn set_filter(&self, filter: StatusFilter) {
        self.state.lock().filter = filter;
        self.load_requests().await;
    }

    /// Best effort; failures leave the previous statistics in place
    pub async fn load_statistics(&self) {
        match self.api.statistics().await {
            Ok(stats) => {
                if self.is_mounted() {
                    self.state.lock().view.statistics = Some(stats);
                }
            }
            Err(e) => tracing::debug!("Statistics refresh failed: {}", e),
        }
    }

    pub fn select(&self, id: i64) -> Option<BorrowRequest> {
        let mut state = self.state.lock();
        let found = state.view.find(id).cloned();
        state.view.selected = found.clone();
        found
    }

    pub fn clear_selection(&self) {
        self.state.lock().view.selected = None;
    }

    /// Entry point for a button press.
    ///
    /// Approve and reject open a response dialog, cancel opens a
    /// confirmation, return and confirm are dispatched right away.
    pub async fn request_action(&self, action: RequestAction, id: i64) -> AppResult<ActionOutcome> {
        {
            let mut state = self.state.lock();
            let current = state
                .view
                .find(id)
                .ok_or_else(|| AppError::NotFound(format!("Request {} is not in this list", id)))?;
            transition::check(current.status, self.role, action)?;

            if transition::requires_response_dialog(action) {
                state.dialog = Some(Dialog::Respond {
                    action,
                    request_id: id,
                    message: String::new(),
                });
                return Ok(ActionOutcome::DialogOpened);
            }
            if transition::requires_confirmation(action) {
                state.dialog = Some(Dialog::ConfirmCancel { request_id: id });
                return Ok(ActionOutcome::DialogOpened);
            }
        }
        self.perform_action(action, id, ResponsePayload::default()).await
    }

    pub fn set_response_message(&self, text: &str) -> AppResult<()> {
        if text.chars().count() > RESPONSE_MESSAGE_MAX {
            return Err(AppError::field(
                "responseMessage",
                "Response message must not exceed 500 characters",
            ));
        }
        let mut state = self.state.lock();
        match state.dialog.as_mut() {
            Some(Dialog::Respond { message, .. }) => {
                *message = text.to_string();
                Ok(())
            }
            _ => Err(AppError::Conflict("No response dialog is open".to_string())),
        }
    }

    /// Dispatch the action behind the open dialog. The dialog closes on success.
    pub async fn submit_dialog(&self) -> AppResult<ActionOutcome> {
        let dialog = self
            .state
            .lock()
            .dialog
            .clone()
            .ok_or_else(|| AppError::Conflict("No dialog is open".to_string()))?;

        match dialog {
            Dialog::Respond {
                action,
                request_id,
                message,
            } => {
                self.perform_action(action, request_id, ResponsePayload::new(Some(message)))
                    .await
            }
            Dialog::ConfirmCancel { request_id } => {
                self.perform_action(RequestAction::Cancel, request_id, ResponsePayload::default())
                    .await
            }
        }
    }

    pub fn dismiss_dialog(&self) {
        self.state.lock().dialog = None;
    }

    /// Run an action with the optimistic update protocol.
    ///
    /// The prediction is applied before the call. On success the server's
    /// copy replaces it and statistics are refetched. On failure the
    /// pre-action view is restored, then outcomes of other actions settled in
    /// the meantime and predictions still in flight are re-applied. Either
    /// way a notification is sent.
    pub async fn perform_action(
        &self,
        action: RequestAction,
        id: i64,
        payload: ResponsePayload,
    ) -> AppResult<ActionOutcome> {
        payload.validate()?;

        let (snapshot, since) = {
            let mut state = self.state.lock();
            if state.in_flight.contains_key(&id) {
                return Err(AppError::Conflict(
                    "An action on this request is already in progress".to_string(),
                ));
            }
            let now = Local::now().naive_local();
            let next = optimistic::apply(&state.view, self.role, action, id, &payload, now)?;
            let snapshot = state.view.snapshot();
            state.view = next;
            state.in_flight.insert(
                id,
                InFlight {
                    action,
                    payload: payload.clone(),
                    at: now,
                },
            );
            (snapshot, state.next_seq)
        };

        tracing::info!(role = %self.role, request_id = id, "Dispatching {}", action);
        let result = self.dispatch(action, id, &payload).await;

        if !self.is_mounted() {
            tracing::debug!(request_id = id, "Discarding {} result after unmount", action);
            let mut state = self.state.lock();
            state.finish(id);
            if state.dialog.as_ref().is_some_and(|d| d.request_id() == id) {
                state.dialog = None;
            }
            return Ok(ActionOutcome::Abandoned);
        }

        match result {
            Ok(server) => {
                {
                    let mut state = self.state.lock();
                    state.finish(id);
                    match server.clone() {
                        Some(server) => {
                            optimistic::reconcile(&mut state.view, server.clone());
                            state.record(Settled::Updated(server));
                        }
                        None => state.record(Settled::Removed(id)),
                    }
                    if state.dialog.as_ref().is_some_and(|d| d.request_id() == id) {
                        state.dialog = None;
                    }
                }
                self.notifier
                    .notify(Notification::success(success_message(action, server.as_ref())));
                self.load_statistics().await;
                Ok(ActionOutcome::Applied(server))
            }
            Err(e) => {
                let replayed = {
                    let mut state = self.state.lock();
                    let settled = state.settled_since(since);
                    let original = snapshot.locate(id).map(|(position, request)| Settled::Restored {
                        position,
                        request: request.clone(),
                    });
                    state.finish(id);

                    let mut view = optimistic::rollback(snapshot);
                    optimistic::replay(&mut view, &settled);
                    let view = state.reapply_in_flight(view, self.role);
                    state.view = view;
                    if let Some(original) = original {
                        state.record(original);
                    }
                    !settled.is_empty()
                };
                tracing::warn!(request_id = id, "{} failed, rolled back: {}", action, e);
                let message = e
                    .specific_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| failure_fallback(action).to_string());
                self.notifier.notify(Notification::error(message));
                if replayed {
                    // snapshot statistics predate the replayed outcomes
                    self.load_statistics().await;
                }
                Err(e)
            }
        }
    }

    async fn dispatch(
        &self,
        action: RequestAction,
        id: i64,
        payload: &ResponsePayload,
    ) -> AppResult<Option<BorrowRequest>> {
        match action {
            RequestAction::Approve => self.api.approve(id, payload).await.map(Some),
            RequestAction::Reject => self.api.reject(id, payload).await.map(Some),
            RequestAction::Return => self.api.mark_returned(id).await.map(Some),
            RequestAction::Confirm => self.api.confirm_return(id).await.map(Some),
            RequestAction::Cancel => self.api.cancel(id).await.map(|_| None),
        }
    }

    pub fn requests(&self) -> Vec<BorrowRequest> {
        self.state.lock().view.requests.clone()
    }

    pub fn selected(&self) -> Option<BorrowRequest> {
        self.state.lock().view.selected.clone()
    }

    pub fn statistics(&self) -> Option<RequestStatistics> {
        self.state.lock().view.statistics
    }

    pub fn filter(&self) -> StatusFilter {
        self.state.lock().filter
    }

    pub fn dialog(&self) -> Option<Dialog> {
        self.state.lock().dialog.clone()
    }

    pub fn load_error(&self) -> Option<String> {
        self.state.lock().load_error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    /// Any action in flight
    pub fn is_processing(&self) -> bool {
        !self.state.lock().in_flight.is_empty()
    }

    pub fn is_processing_request(&self, id: i64) -> bool {
        self.state.lock().in_flight.contains_key(&id)
    }

    /// Action currently in flight for request `id`
    pub fn processing_action(&self, id: i64) -> Option<RequestAction> {
        self.state.lock().in_flight.get(&id).map(|pending| pending.action)
    }

    /// Actions offered for request `id` in this role
    pub fn available_actions(&self, id: i64) -> &'static [RequestAction] {
        match self.state.lock().view.find(id) {
            Some(request) => transition::allowed_actions(request.status, self.role),
            None => &[],
        }
    }

    /// Count shown next to each filter option, once statistics are known
    pub fn filter_counts(&self) -> Vec<(StatusFilter, Option<u32>)> {
        let stats = self.statistics();
        std::iter::once(StatusFilter::All)
            .chain(RequestStatus::ALL.into_iter().map(StatusFilter::Only))
            .map(|filter| (filter, stats.map(|s| s.count_for_filter(filter, self.role))))
            .collect()
    }
}

fn success_message(action: RequestAction, server: Option<&BorrowRequest>) -> String {
    match action {
        RequestAction::Approve => match server {
            Some(request) => format!(
                "Request approved! {} can now borrow your item.",
                request.borrower.display_name()
            ),
            None => "Request approved!".to_string(),
        },
        RequestAction::Reject => "Request rejected. The item remains available.".to_string(),
        RequestAction::Return => "Item marked as returned. Waiting for borrower confirmation.".to_string(),
        RequestAction::Confirm => "Return confirmed! Transaction completed successfully.".to_string(),
        RequestAction::Cancel => "Request canceled successfully".to_string(),
    }
}

fn failure_fallback(action: RequestAction) -> &'static str {
    match action {
        RequestAction::Cancel => "Failed to cancel request",
        _ => "Action failed",
    }
}
