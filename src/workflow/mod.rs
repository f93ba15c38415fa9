//! Borrow request workflow: transition rules, optimistic updates and the
//! per-role controller

pub mod controller;
pub mod optimistic;
pub mod transition;

pub use controller::{ActionOutcome, Dialog, RequestsController};
pub use optimistic::{Snapshot, ViewState};
pub use transition::{allowed_actions, Transition};
