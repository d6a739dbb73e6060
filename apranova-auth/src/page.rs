//! Page-level state machines for the public auth surfaces
//!
//! [`AuthPage`] runs the silent session check when a login/signup/reset page
//! mounts. [`LoginForm`] drives one submission at a time and turns failures
//! into banner plus field feedback.

use std::sync::Arc;

use apranova_core::with_timeout;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{AuthError, FieldErrors};
use crate::manager::SessionManager;
use crate::types::{LoginCredentials, RedirectDecision, Role};

/// Lifecycle of a public auth page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Mounted, check not started yet
    Idle,
    /// Silent check in flight; show a spinner, not the form
    Checking,
    /// A session exists; navigate away. Terminal.
    Redirecting(String),
    /// No usable session; render the form
    Ready,
}

impl PageState {
    pub fn is_settled(&self) -> bool {
        matches!(self, PageState::Redirecting(_) | PageState::Ready)
    }
}

impl From<RedirectDecision> for PageState {
    fn from(decision: RedirectDecision) -> Self {
        match decision {
            RedirectDecision::Redirect(path) => PageState::Redirecting(path),
            RedirectDecision::Render => PageState::Ready,
        }
    }
}

/// A mounted public auth page.
///
/// Dropping or unmounting the page aborts the check; its result is then
/// never published.
pub struct AuthPage {
    state: watch::Receiver<PageState>,
    task: Option<JoinHandle<()>>,
}

impl AuthPage {
    /// Start the silent session check in the background
    pub fn mount(manager: Arc<SessionManager>) -> Self {
        let (tx, rx) = watch::channel(PageState::Idle);
        let timeout_ms = manager.check_timeout_ms();

        let task = tokio::spawn(async move {
            let _ = tx.send(PageState::Checking);

            let state = match with_timeout(
                manager.check_existing_session(),
                timeout_ms,
                "check_existing_session",
            )
            .await
            {
                Ok(decision) => PageState::from(decision),
                Err(e) => {
                    warn!(error = %e, "Session check timed out, rendering page");
                    PageState::Ready
                }
            };

            debug!(state = ?state, "Session check settled");
            // Nobody listening means the page is gone
            let _ = tx.send(state);
        });

        Self {
            state: rx,
            task: Some(task),
        }
    }

    /// Current state
    pub fn state(&self) -> PageState {
        self.state.borrow().clone()
    }

    /// Receiver for observing state changes
    pub fn subscribe(&self) -> watch::Receiver<PageState> {
        self.state.clone()
    }

    /// Wait until the check reaches `Redirecting` or `Ready`.
    ///
    /// Returns the current state unchanged if the check was aborted.
    pub async fn settled(&mut self) -> PageState {
        let settled = self
            .state
            .wait_for(PageState::is_settled)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state.borrow().clone())
    }

    /// Tear the page down, discarding any pending result
    pub fn unmount(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("Aborting session check");
            }
            task.abort();
        }
    }
}

impl Drop for AuthPage {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Banner plus per-field annotations shown after a failed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFeedback {
    pub title: String,
    /// `None` once dismissed, or when only fields are annotated
    pub banner: Option<String>,
    pub field_errors: FieldErrors,
}

impl FormFeedback {
    pub fn from_error(error: &AuthError) -> Self {
        let field_errors = error.field_errors().cloned().unwrap_or_default();

        // Client-side validation shows under the fields only
        let banner = match error {
            AuthError::Validation {
                status: None,
                message: None,
                ..
            } if !field_errors.is_empty() => None,
            _ => Some(error.user_message()),
        };

        Self {
            title: error.title(),
            banner,
            field_errors,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.field_errors.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    Submitting,
    Success { redirect_to: String },
    Failure(FormFeedback),
}

/// Login form with role selector
pub struct LoginForm {
    manager: Arc<SessionManager>,
    role: Role,
    redirect_param: Option<String>,
    state: LoginState,
}

impl LoginForm {
    /// `redirect_param` is the page's `?redirect=` value, if any
    pub fn new(manager: Arc<SessionManager>, redirect_param: Option<&str>) -> Self {
        Self {
            manager,
            role: Role::Student,
            redirect_param: redirect_param.map(str::to_string),
            state: LoginState::Idle,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn select_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, LoginState::Submitting)
    }

    /// Submit the form. A failed attempt leaves the form ready for another.
    pub async fn submit(&mut self, email: &str, password: &str) -> &LoginState {
        let credentials = LoginCredentials::new(email, password, self.role);
        self.state = LoginState::Submitting;

        self.state = match self
            .manager
            .login(&credentials, self.redirect_param.as_deref())
            .await
        {
            Ok(user) => LoginState::Success {
                redirect_to: user.redirect_to,
            },
            Err(e) => LoginState::Failure(FormFeedback::from_error(&e)),
        };

        &self.state
    }

    /// Close the error banner, keeping field annotations
    pub fn dismiss_banner(&mut self) {
        if let LoginState::Failure(feedback) = &mut self.state {
            feedback.banner = None;
        }
    }

    /// Drop the annotation on a field once the user edits it
    pub fn clear_field_error(&mut self, field: &str) {
        if let LoginState::Failure(feedback) = &mut self.state {
            feedback.field_errors.remove(field);
        }
    }
}
