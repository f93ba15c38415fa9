//! AI title/description generation with quota and rate-limit tracking

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{
    api::ItemsApi,
    error::{AppError, AppResult},
    models::item::{AiGeneration, AiGenerationRequest, GenerationKind},
};

/// Wait applied when a 429 carries no `retry-after`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct GenerationState {
    remaining_requests: Option<u32>,
    blocked_until: Option<Instant>,
}

#[derive(Clone)]
pub struct GenerationService {
    items: Arc<dyn ItemsApi>,
    state: Arc<Mutex<GenerationState>>,
}

impl GenerationService {
    pub fn new(items: Arc<dyn ItemsApi>) -> Self {
        Self {
            items,
            state: Arc::new(Mutex::new(GenerationState::default())),
        }
    }

    /// Generate content, refusing while a rate-limit countdown is running
    pub async fn generate(&self, kind: GenerationKind, request: &AiGenerationRequest) -> AppResult<AiGeneration> {
        if let Some(wait) = self.retry_after() {
            return Err(AppError::RateLimited {
                message: format!(
                    "You've reached the generation limit. Please wait {} seconds before trying again.",
                    wait.as_secs().max(1)
                ),
                retry_after: Some(wait),
            });
        }

        match self.items.generate(kind, request).await {
            Ok(generation) => {
                let mut state = self.state.lock();
                if generation.remaining_requests.is_some() {
                    state.remaining_requests = generation.remaining_requests;
                }
                state.blocked_until = None;
                Ok(generation)
            }
            Err(e) => {
                if let AppError::RateLimited { retry_after, .. } = &e {
                    let wait = retry_after.unwrap_or(DEFAULT_RETRY_AFTER);
                    tracing::warn!("Generation rate limited for {}s", wait.as_secs());
                    let mut state = self.state.lock();
                    state.blocked_until = Some(Instant::now() + wait);
                    state.remaining_requests = Some(0);
                }
                Err(e)
            }
        }
    }

    pub async fn is_available(&self) -> bool {
        match self.items.ai_available().await {
            Ok(available) => available,
            Err(e) => {
                tracing::debug!("AI availability check failed: {}", e);
                false
            }
        }
    }

    /// Remaining time on the rate-limit countdown
    pub fn retry_after(&self) -> Option<Duration> {
        let mut state = self.state.lock();
        match state.blocked_until {
            Some(until) => {
                let now = Instant::now();
                if until > now {
                    Some(until - now)
                } else {
                    state.blocked_until = None;
                    None
                }
            }
            None => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.retry_after().is_some()
    }

    pub fn remaining_requests(&self) -> Option<u32> {
        self.state.lock().remaining_requests
    }
}
