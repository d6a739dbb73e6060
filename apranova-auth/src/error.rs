//! Authentication error taxonomy
//!
//! Every failure a user-initiated action can hit maps to one variant with a
//! fixed, human-readable title and message. Backend bodies are only surfaced
//! where they are safe to show (403 detail, validation messages).

use crate::types::Role;
use apranova_core::CoreError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error, warn};

pub type AuthResult<T> = Result<T, AuthError>;

/// Field name -> first message for that field
pub type FieldErrors = BTreeMap<String, String>;

const GENERIC_MESSAGE: &str = "An unexpected error occurred. Please try again.";
const CHECK_INPUT_MESSAGE: &str = "Please check your input and try again.";

/// Keys that carry the banner message rather than a field annotation
const MESSAGE_KEYS: [&str; 4] = ["error", "detail", "message", "non_field_errors"];

#[derive(Error, Debug)]
pub enum AuthError {
    /// No response reached the client (offline, DNS, timeout)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// 401: credentials or token rejected
    #[error("Authentication failed")]
    Authentication,

    /// 403: valid credentials, wrong role or permission
    #[error("Access denied: {}", .detail.as_deref().unwrap_or("insufficient permissions"))]
    Authorization {
        detail: Option<String>,
        actual_role: Option<Role>,
    },

    /// 400/422 from the backend, or client-side validation (no status)
    #[error("Validation failed: {}", .message.as_deref().unwrap_or("invalid input"))]
    Validation {
        status: Option<u16>,
        message: Option<String>,
        field_errors: FieldErrors,
    },

    /// 429
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 5xx; the body is never exposed
    #[error("Server error (HTTP {status})")]
    Server { status: u16 },

    /// Any other 4xx
    #[error("Request rejected (HTTP {status})")]
    Rejected { status: u16, detail: Option<String> },

    /// Password-reset link lacks its uid or token
    #[error("Invalid or missing reset link")]
    InvalidResetLink,

    /// A 2xx body that does not have the expected shape
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    #[error("Session storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AuthError {
    /// Classify a non-success HTTP response
    pub fn from_response(status: u16, body: &str) -> Self {
        let data = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        match status {
            400 | 422 => AuthError::Validation {
                status: Some(status),
                message: banner_message(&data),
                field_errors: field_errors(&data),
            },
            401 => AuthError::Authentication,
            403 => AuthError::Authorization {
                detail: text(data.get("detail")).or_else(|| text(data.get("error"))),
                actual_role: data
                    .get("actual_role")
                    .and_then(Value::as_str)
                    .and_then(|r| r.parse().ok()),
            },
            429 => AuthError::RateLimited,
            500..=599 => AuthError::Server { status },
            200..=299 => AuthError::UnexpectedResponse {
                message: format!("HTTP {} treated as failure", status),
            },
            _ => AuthError::Rejected {
                status,
                detail: banner_message(&data),
            },
        }
    }

    /// Client-side validation failure; no request was made
    pub fn validation(field_errors: FieldErrors) -> Self {
        AuthError::Validation {
            status: None,
            message: None,
            field_errors,
        }
    }

    pub fn storage<E>(message: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AuthError::Storage {
            message: message.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Banner title
    pub fn title(&self) -> String {
        match self {
            AuthError::Network { .. } => "Network Error".to_string(),
            AuthError::Authentication => "Invalid Credentials".to_string(),
            AuthError::Authorization { .. } => "Access Denied".to_string(),
            AuthError::Validation {
                status: Some(422), ..
            } => "Validation Error".to_string(),
            AuthError::Validation { .. } => "Invalid Request".to_string(),
            AuthError::RateLimited => "Too Many Requests".to_string(),
            AuthError::Server { status: 503 } => "Service Unavailable".to_string(),
            AuthError::Server { .. } => "Server Error".to_string(),
            AuthError::Rejected { status: 404, .. } => "Not Found".to_string(),
            AuthError::Rejected { status: 409, .. } => "Conflict".to_string(),
            AuthError::Rejected { status, .. } => format!("Error {}", status),
            AuthError::InvalidResetLink => "Invalid Reset Link".to_string(),
            _ => "Error".to_string(),
        }
    }

    /// Banner message; never reveals which credential was wrong or any
    /// server internals
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Network { .. } => {
                "Unable to connect to the server. Please check your internet connection."
                    .to_string()
            }
            AuthError::Authentication => "Incorrect email or password.".to_string(),
            AuthError::Authorization { detail, .. } => detail.clone().unwrap_or_else(|| {
                "You don't have permission to access this resource.".to_string()
            }),
            AuthError::Validation { message, .. } => message
                .clone()
                .unwrap_or_else(|| CHECK_INPUT_MESSAGE.to_string()),
            AuthError::RateLimited => {
                "You've made too many requests. Please try again later.".to_string()
            }
            AuthError::Server { status: 503 } => {
                "The service is temporarily unavailable. Please try again later.".to_string()
            }
            AuthError::Server { .. } => {
                "An internal server error occurred. Please try again later.".to_string()
            }
            AuthError::Rejected { status, detail } => detail.clone().unwrap_or_else(|| {
                match status {
                    404 => "The requested resource was not found.",
                    409 => "A conflict occurred with the current state.",
                    _ => "The request could not be completed. Please try again.",
                }
                .to_string()
            }),
            AuthError::InvalidResetLink => {
                "Invalid or missing reset link. Please request a new password reset link."
                    .to_string()
            }
            AuthError::Storage { .. } => {
                "Your session could not be saved on this device. Please try again.".to_string()
            }
            AuthError::UnexpectedResponse { .. } | AuthError::Core(_) => {
                GENERIC_MESSAGE.to_string()
            }
        }
    }

    /// Per-field annotations, when the failure carries any
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AuthError::Validation { field_errors, .. } if !field_errors.is_empty() => {
                Some(field_errors)
            }
            _ => None,
        }
    }

    /// HTTP status behind the error, if one was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AuthError::Authentication => Some(401),
            AuthError::Authorization { .. } => Some(403),
            AuthError::Validation { status, .. } => *status,
            AuthError::RateLimited => Some(429),
            AuthError::Server { status } | AuthError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same action can succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            AuthError::Network { .. } | AuthError::RateLimited | AuthError::Server { .. } => true,
            AuthError::Core(core) => core.is_recoverable(),
            _ => false,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self, operation: &str) {
        match self {
            AuthError::Network { .. } | AuthError::Server { .. } | AuthError::RateLimited => {
                warn!(operation = operation, error = %self, "Backend unavailable or throttled");
            }
            AuthError::Storage { .. } | AuthError::UnexpectedResponse { .. } | AuthError::Core(_) => {
                error!(operation = operation, error = %self, "Internal failure");
            }
            _ => {
                debug!(operation = operation, error = %self, "Request rejected");
            }
        }
    }
}

/// String, or list of strings joined with ", "
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn banner_message(data: &Map<String, Value>) -> Option<String> {
    MESSAGE_KEYS.iter().find_map(|key| text(data.get(*key)))
}

fn field_errors(data: &Map<String, Value>) -> FieldErrors {
    data.iter()
        .filter(|(key, _)| !MESSAGE_KEYS.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let first = match value {
                Value::String(s) => Some(s.clone()),
                Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
                _ => None,
            }?;
            Some((key.clone(), first))
        })
        .collect()
}
