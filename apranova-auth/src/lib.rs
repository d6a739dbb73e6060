//! Apranova Auth - client-side session manager for the Apranova learning platform
//!
//! Keeps the access/refresh token pair, decides whether a visitor on a public
//! auth page already has a session, performs login, logout and password reset
//! against the REST backend, and maps roles to their dashboards.
//!
//! ```no_run
//! use std::sync::Arc;
//! use apranova_auth::{LoginCredentials, Role, SessionManager};
//! use apranova_core::ClientConfig;
//!
//! # async fn run() -> apranova_auth::AuthResult<()> {
//! let config = ClientConfig::load(None)?;
//! let manager = Arc::new(SessionManager::from_config(&config)?);
//!
//! let credentials = LoginCredentials::new("ada@example.com", "correct-horse", Role::Student);
//! let user = manager.login(&credentials, None).await?;
//! println!("navigate to {}", user.redirect_to);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod manager;
pub mod page;
pub mod redirect;
pub mod routes;
pub mod store;
pub mod types;
pub mod validation;

pub use api::{AuthApi, HttpAuthApi};
pub use error::{AuthError, AuthResult, FieldErrors};
pub use manager::{ResetLink, SessionManager};
pub use page::{AuthPage, FormFeedback, LoginForm, LoginState, PageState};
pub use redirect::{resolve_redirect, role_to_path};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use types::*;
