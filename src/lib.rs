//! RentKar client
//!
//! Client library for the RentKar peer-to-peer lending backend: a typed REST
//! layer, the session controller, and the borrow-request workflow with
//! optimistic updates and rollback.

use std::sync::Arc;

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod views;
pub mod workflow;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared by front ends
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
