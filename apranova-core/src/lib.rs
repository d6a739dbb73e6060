//! Apranova Core - Shared infrastructure for the Apranova client crates
//!
//! Error context, logging setup, layered configuration and async helpers used
//! by the session manager and the command-line front-end.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
