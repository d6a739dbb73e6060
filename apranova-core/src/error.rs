//! Infrastructure errors
//!
//! Configuration, logging and timeout failures carry an [`ErrorContext`] so
//! the CLI can print what went wrong and what to try next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};

pub type CoreResult<T> = Result<T, CoreError>;

/// Where a failure happened and what the user can do about it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Correlates the log line with what the user saw
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    /// e.g. `config`, `logging`, `http_client`
    pub component: String,
    pub operation: Option<String>,
    pub metadata: HashMap<String, String>,
    /// Shown to the user, in order
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Error type for configuration, logging and async helpers
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Logging error: {message}")]
    Logging {
        message: String,
        context: ErrorContext,
    },

    #[error("{operation} timed out after {duration_ms} ms")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            CoreError::Config { context, .. } => Some(context),
            CoreError::Logging { context, .. } => Some(context),
            CoreError::Timeout { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Only timeouts are worth retrying as-is
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::Timeout { .. })
    }

    pub fn log(&self) {
        match self {
            CoreError::Timeout { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Infrastructure operation timed out"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Infrastructure failure"
                );
            }
        }
    }
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::CoreError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the TOML file passed with --config")
                .with_suggestion("Run 'apranova config --init' to create default config"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::CoreError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the TOML file passed with --config"),
        }
    };
}
