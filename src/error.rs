//! Error types for the RentKar client

use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Coarse error classes, used to pick how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    RateLimited,
    ServiceUnavailable,
    Network,
    Conflict,
    InvalidTransition,
    Decode,
    Config,
    Io,
    Internal,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body returned by the backend.
///
/// Fields are read independently so one unexpected shape does not hide the
/// others. `errors` is either a field-to-message map or a list of
/// `{ field, defaultMessage }` objects.
#[derive(Debug, Default, PartialEq)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub errors: HashMap<String, String>,
    pub retry_after: Option<u64>,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Self {
        let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) else {
            return Self::default();
        };

        Self {
            message: fields
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string),
            errors: fields.get("errors").map(field_errors).unwrap_or_default(),
            retry_after: fields.get("retryAfter").and_then(Value::as_u64),
        }
    }
}

fn field_errors(errors: &Value) -> HashMap<String, String> {
    match errors {
        Value::Object(map) => map
            .iter()
            .filter_map(|(field, message)| Some((field.clone(), message.as_str()?.to_string())))
            .collect(),
        Value::Array(list) => list
            .iter()
            .filter_map(|entry| {
                let field = entry.get("field")?.as_str()?;
                let message = entry
                    .get("defaultMessage")
                    .or_else(|| entry.get("message"))?
                    .as_str()?;
                Some((field.to_string(), message.to_string()))
            })
            .collect(),
        _ => HashMap::new(),
    }
}

pub const NETWORK_MESSAGE: &str =
    "Unable to connect to the server. Please check your internet connection.";
pub const SERVICE_MESSAGE: &str = "The service is temporarily unavailable. Please try again later.";
pub const GENERIC_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Sentence used for a failed response that carries no message of its own
pub fn default_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "Invalid request. Please check your input and try again.",
        ErrorKind::Authentication => "Authentication failed. Please log in again.",
        ErrorKind::Authorization => "You are not allowed to perform this action.",
        ErrorKind::NotFound => "The requested resource was not found.",
        ErrorKind::RateLimited => "You've reached the request limit. Please wait before trying again.",
        ErrorKind::ServiceUnavailable => SERVICE_MESSAGE,
        ErrorKind::Network => NETWORK_MESSAGE,
        _ => GENERIC_MESSAGE,
    }
}

impl AppError {
    /// Classify a failed HTTP response.
    ///
    /// The server `message` is kept verbatim when present; otherwise the
    /// class's `default_message` is used.
    pub fn from_response(status: StatusCode, body: &str, retry_after: Option<Duration>) -> Self {
        let parsed = ErrorBody::parse(body);
        let message = |kind| {
            parsed
                .message
                .clone()
                .unwrap_or_else(|| default_message(kind).to_string())
        };

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation {
                message: message(ErrorKind::Validation),
                field_errors: parsed.errors.clone(),
            },
            StatusCode::UNAUTHORIZED => AppError::Authentication(message(ErrorKind::Authentication)),
            StatusCode::FORBIDDEN => AppError::Authorization(message(ErrorKind::Authorization)),
            StatusCode::NOT_FOUND => AppError::NotFound(message(ErrorKind::NotFound)),
            StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited {
                message: message(ErrorKind::RateLimited),
                retry_after: retry_after.or(parsed.retry_after.map(Duration::from_secs)),
            },
            s if s.is_server_error() => AppError::ServiceUnavailable(message(ErrorKind::ServiceUnavailable)),
            _ => AppError::Internal(message(ErrorKind::Internal)),
        }
    }

    /// Build a validation error for a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.clone());
        AppError::Validation { message, field_errors }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::Authentication(_) => ErrorKind::Authentication,
            AppError::Authorization(_) => ErrorKind::Authorization,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::RateLimited { .. } => ErrorKind::RateLimited,
            AppError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            AppError::Network(_) => ErrorKind::Network,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::InvalidTransition(_) => ErrorKind::InvalidTransition,
            AppError::Decode(_) => ErrorKind::Decode,
            AppError::Config(_) => ErrorKind::Config,
            AppError::Io(_) => ErrorKind::Io,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Sentence suitable for showing to a user
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation { message, .. }
            | AppError::RateLimited { message, .. }
            | AppError::Authentication(message)
            | AppError::Authorization(message)
            | AppError::NotFound(message)
            | AppError::ServiceUnavailable(message)
            | AppError::Conflict(message)
            | AppError::InvalidTransition(message) => message.clone(),
            AppError::Network(_) => NETWORK_MESSAGE.to_string(),
            AppError::Decode(_) | AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => {
                GENERIC_MESSAGE.to_string()
            }
        }
    }

    /// Message specific to this failure, from the backend or a local check.
    ///
    /// `None` for transport and decode failures, and when only the class's
    /// `default_message` is known.
    pub fn specific_message(&self) -> Option<&str> {
        let message = match self {
            AppError::Validation { message, .. }
            | AppError::RateLimited { message, .. }
            | AppError::Authentication(message)
            | AppError::Authorization(message)
            | AppError::NotFound(message)
            | AppError::ServiceUnavailable(message)
            | AppError::Internal(message) => message,
            _ => return None,
        };
        (message != default_message(self.kind())).then_some(message.as_str())
    }

    /// True when no response was received from the backend
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Network(_))
    }

    /// Countdown before the next attempt is accepted, for rate-limited calls
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AppError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::Decode(e.to_string())
        } else if e.is_builder() {
            AppError::Internal(format!("Invalid request: {}", e))
        } else {
            AppError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Decode(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut field_errors = HashMap::new();
        for (field, errs) in errors.field_errors() {
            if let Some(first) = errs.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                field_errors.insert(field.to_string(), message);
            }
        }
        let mut keys: Vec<&String> = field_errors.keys().collect();
        keys.sort();
        let message = keys
            .first()
            .and_then(|k| field_errors.get(*k))
            .cloned()
            .unwrap_or_else(|| "Invalid input".to_string());

        AppError::Validation { message, field_errors }
    }
}

/// Result type alias for client operations
pub type AppResult<T> = Result<T, AppError>;
