//! Session state and the session controller
//!
//! `SessionStore` holds the current user and bearer token behind a watch
//! channel so views can subscribe to changes. The token is optionally
//! persisted to a file so a later run can restore the session.
//! `SessionService` drives restore/login/register/logout against the backend.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use validator::Validate;

use crate::{
    api::AuthApi,
    error::{AppError, AppResult},
    models::user::{LoginRequest, RegisterRequest, User},
};

pub const CONNECTION_MESSAGE: &str =
    "An unexpected error occurred. Please check your connection and try again.";

/// Snapshot of the current session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_loading: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

/// Shared session state
pub struct SessionStore {
    state: watch::Sender<Session>,
    token_file: Option<PathBuf>,
}

impl SessionStore {
    /// Create a store; the session starts in the loading state until restored.
    pub fn new(token_file: Option<PathBuf>) -> Self {
        let (state, _) = watch::channel(Session {
            is_loading: true,
            ..Default::default()
        });
        Self { state, token_file }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Token persisted by a previous run, if any
    pub fn persisted_token(&self) -> AppResult<Option<String>> {
        let Some(path) = &self.token_file else {
            return Ok(None);
        };
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let token = contents.trim().to_string();
                Ok((!token.is_empty()).then_some(token))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Install a token without a user (used while it is being verified)
    pub fn set_token(&self, token: String) {
        self.state.send_modify(|s| s.token = Some(token));
    }

    /// Replace the whole session and persist the token
    pub fn establish(&self, user: User, token: String) -> AppResult<()> {
        self.persist(&token)?;
        self.state.send_modify(|s| {
            s.user = Some(user);
            s.token = Some(token);
        });
        Ok(())
    }

    pub fn set_user(&self, user: User) {
        self.state.send_modify(|s| s.user = Some(user));
    }

    /// Drop user and token, in memory and on disk
    pub fn clear(&self) {
        if let Some(path) = &self.token_file {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove persisted token {}: {}", path.display(), e);
                }
            }
        }
        self.state.send_modify(|s| {
            s.user = None;
            s.token = None;
        });
    }

    pub fn finish_loading(&self) {
        self.state.send_modify(|s| s.is_loading = false);
    }

    fn persist(&self, token: &str) -> AppResult<()> {
        let Some(path) = &self.token_file else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, token)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

/// User-facing sentence for a failed login/registration.
///
/// Transport failures get a connectivity message; declared API failures keep
/// the server's message, falling back to `fallback`.
pub fn failure_message(err: &AppError, fallback: &str) -> String {
    if err.is_transport() {
        return CONNECTION_MESSAGE.to_string();
    }
    if let AppError::Validation { .. } = err {
        return err.user_message();
    }
    err.specific_message()
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Session controller
#[derive(Clone)]
pub struct SessionService {
    store: Arc<SessionStore>,
    auth: Arc<dyn AuthApi>,
}

impl SessionService {
    pub fn new(store: Arc<SessionStore>, auth: Arc<dyn AuthApi>) -> Self {
        Self { store, auth }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Restore the session from the persisted token.
    ///
    /// An invalid or expired token is discarded and the session proceeds
    /// unauthenticated. The loading flag is always cleared.
    pub async fn restore(&self) -> Option<User> {
        let token = match self.store.persisted_token() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Failed to read persisted token: {}", e);
                None
            }
        };

        let user = match token {
            Some(token) => {
                self.store.set_token(token);
                match self.auth.current_user().await {
                    Ok(user) => {
                        tracing::info!("Restored session for {}", user.username);
                        self.store.set_user(user.clone());
                        Some(user)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to restore session: {}", e);
                        self.store.clear();
                        None
                    }
                }
            }
            None => None,
        };

        self.store.finish_loading();
        user
    }

    pub async fn login(&self, credentials: LoginRequest) -> AppResult<User> {
        credentials.validate()?;
        let response = self.auth.login(&credentials).await?;
        self.store.establish(response.user.clone(), response.token)?;
        tracing::info!("Logged in as {}", response.user.username);
        Ok(response.user)
    }

    /// Register an account. The session is left untouched; log in afterwards.
    pub async fn register(&self, data: RegisterRequest) -> AppResult<User> {
        data.validate()?;
        let user = self.auth.register(&data).await?;
        tracing::info!("Registered account {}", user.username);
        Ok(user)
    }

    pub fn logout(&self) {
        self.store.clear();
        tracing::info!("Logged out");
    }

    pub fn current_user(&self) -> Option<User> {
        self.store.user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.snapshot().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.store.snapshot().is_loading
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store.subscribe()
    }
}
