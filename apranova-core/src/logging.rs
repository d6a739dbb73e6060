//! Logging setup
//!
//! One `tracing` subscriber for the whole process, configured from the
//! `[logging]` table. `RUST_LOG` overrides the base level.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::error::{CoreError, CoreResult, ErrorContext};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Source file and line on each event
    pub include_location: bool,
    pub include_thread: bool,
    /// Append to `log_file_path` instead of stderr
    pub log_to_file: bool,
    pub log_file_path: Option<String>,
    /// Whether to log span durations when spans close
    pub enable_performance_monitoring: bool,
    /// Extra `target=level` directives
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_thread: false,
            log_to_file: false,
            log_file_path: None,
            enable_performance_monitoring: false,
            filter_directives: vec![
                "apranova=info".to_string(),
                "apranova_core=info".to_string(),
                "apranova_auth=info".to_string(),
            ],
        }
    }
}

/// Initialize the global tracing subscriber
pub fn init_logging(config: &LoggingConfig) -> CoreResult<()> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    for directive in &config.filter_directives {
        let parsed = directive.parse().map_err(|e| CoreError::Logging {
            message: format!("Invalid filter directive '{}': {}", directive, e),
            context: ErrorContext::new("logging").with_operation("parse_directive"),
        })?;
        filter = filter.add_directive(parsed);
    }

    let span_events = if config.enable_performance_monitoring {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_span_events(span_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread);

    let writer = if config.log_to_file {
        let log_path = config
            .log_file_path
            .as_ref()
            .ok_or_else(|| CoreError::Logging {
                message: "log_file_path must be specified when log_to_file is true".to_string(),
                context: ErrorContext::new("logging")
                    .with_operation("open_log_file")
                    .with_suggestion("Set logging.log_file_path"),
            })?;
        let file = OpenOptions::new().create(true).append(true).open(log_path)?;
        fmt::writer::BoxMakeWriter::new(Mutex::new(file))
    } else {
        // stdout carries command output, so diagnostics go to stderr
        fmt::writer::BoxMakeWriter::new(io::stderr)
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => base.json().with_writer(writer).boxed(),
        LogFormat::Pretty => base.pretty().with_writer(writer).boxed(),
        LogFormat::Compact => base.compact().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| CoreError::Logging {
            message: format!("Failed to install subscriber: {}", e),
            context: ErrorContext::new("logging").with_operation("init"),
        })?;

    Ok(())
}

/// Timing helpers
pub mod performance {
    use std::time::Instant;
    use tracing::{info_span, Instrument};

    /// Run `future` inside a span and log how long it took at debug
    pub async fn measure_async<F, T>(operation_name: &str, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let span = info_span!("performance", operation = operation_name);
        let start = Instant::now();

        let result = future.instrument(span).await;

        tracing::debug!(
            target: "performance",
            operation = operation_name,
            duration_ms = start.elapsed().as_millis() as u64,
            "Operation completed"
        );

        result
    }
}

/// Start/success/failure events with a shared `operation` field
#[macro_export]
macro_rules! log_operation_start {
    ($operation:expr) => {
        tracing::info!(
            operation = $operation,
            "Starting operation"
        );
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info!(
            operation = $operation,
            $($field)*,
            "Starting operation"
        );
    };
}

#[macro_export]
macro_rules! log_operation_success {
    ($operation:expr) => {
        tracing::info!(
            operation = $operation,
            "Operation completed successfully"
        );
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info!(
            operation = $operation,
            $($field)*,
            "Operation completed successfully"
        );
    };
}

#[macro_export]
macro_rules! log_operation_error {
    ($operation:expr, $error:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "Operation failed"
        );
    };
    ($operation:expr, $error:expr, $($field:tt)*) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            $($field)*,
            "Operation failed"
        );
    };
}
