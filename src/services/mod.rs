//! Client-side services

pub mod generation;
pub mod notifications;
pub mod session;

use std::sync::Arc;

use crate::{
    api::{AuthClient, HttpClient, ItemsApi, ItemsClient, RequestsApi, RequestsClient},
    config::AppConfig,
    error::AppResult,
    models::ViewRole,
    workflow::RequestsController,
};

use generation::GenerationService;
use notifications::Notifier;
use session::{SessionService, SessionStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub session: Arc<SessionService>,
    pub requests: Arc<dyn RequestsApi>,
    pub items: Arc<dyn ItemsApi>,
    pub generation: Arc<GenerationService>,
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    /// Create all services from configuration, sharing one session store
    pub fn new(config: &AppConfig, notifier: Arc<dyn Notifier>) -> AppResult<Self> {
        let store = Arc::new(SessionStore::new(config.session.token_file.clone()));
        let http = HttpClient::new(&config.api, store.clone())?;

        let items: Arc<dyn ItemsApi> = Arc::new(ItemsClient::new(http.clone(), config.uploads.clone()));

        Ok(Self {
            session: Arc::new(SessionService::new(store, Arc::new(AuthClient::new(http.clone())))),
            requests: Arc::new(RequestsClient::new(http)),
            generation: Arc::new(GenerationService::new(items.clone())),
            items,
            notifier,
        })
    }

    /// A fresh workflow controller for one role view
    pub fn requests_controller(&self, role: ViewRole) -> RequestsController {
        RequestsController::new(role, self.requests.clone(), self.notifier.clone())
    }
}
