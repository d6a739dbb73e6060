//! Session Manager - token lifecycle and redirect decisions
//!
//! Owns the refresh-then-profile sequence of the silent session check on
//! public pages, the refresh-and-retry wrapper for authenticated requests,
//! plus login, logout and password reset.

use std::future::Future;
use std::sync::Arc;

use apranova_core::performance::measure_async;
use apranova_core::{log_operation_start, log_operation_success, ClientConfig};
use tracing::{debug, info, warn};

use crate::api::{AuthApi, HttpAuthApi};
use crate::error::{AuthError, AuthResult};
use crate::redirect::{resolve_redirect, role_to_path};
use crate::routes;
use crate::store::{FileSessionStore, SessionStore};
use crate::types::{
    AuthenticatedUser, GuardDecision, LoginCredentials, PasswordResetConfirm, RedirectDecision,
    UserProfile,
};
use crate::validation;

/// uid/token pair carried by a password-reset link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetLink {
    pub uid: Option<String>,
    pub token: Option<String>,
}

impl ResetLink {
    pub fn new(uid: Option<&str>, token: Option<&str>) -> Self {
        let clean = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
        Self {
            uid: clean(uid),
            token: clean(token),
        }
    }

    /// Parse from a full link (`https://…/reset-password/confirm?uid=..&token=..`)
    /// or from a bare query string (`uid=..&token=..`)
    pub fn parse(link: &str) -> Self {
        let link = link.trim();
        let query = match url::Url::parse(link) {
            Ok(url) => url.query().unwrap_or_default().to_string(),
            Err(_) => match link.split_once('?') {
                Some((_, query)) => query.to_string(),
                None => link.to_string(),
            },
        };

        let mut uid = None;
        let mut token = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "uid" => uid = Some(value.into_owned()),
                "token" => token = Some(value.into_owned()),
                _ => {}
            }
        }

        Self::new(uid.as_deref(), token.as_deref())
    }

    fn parts(&self) -> Option<(&str, &str)> {
        Some((self.uid.as_deref()?, self.token.as_deref()?))
    }
}

/// Bound on the whole silent check when no request timeout is configured
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 60_000;

/// Session manager over an injectable backend and token store
#[derive(Clone)]
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn SessionStore>,
    check_timeout_ms: u64,
}

impl SessionManager {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            api,
            store,
            check_timeout_ms: DEFAULT_CHECK_TIMEOUT_MS,
        }
    }

    /// Override the bound on the silent session check
    pub fn with_check_timeout(mut self, timeout_ms: u64) -> Self {
        self.check_timeout_ms = timeout_ms;
        self
    }

    /// Refresh plus profile fetch may each take one request timeout
    pub fn check_timeout_ms(&self) -> u64 {
        self.check_timeout_ms
    }

    /// HTTP backend plus file-backed token storage, both from configuration
    pub fn from_config(config: &ClientConfig) -> AuthResult<Self> {
        let api = HttpAuthApi::new(config.api.clone())?;
        let store = FileSessionStore::with_keys(
            config.storage.session_path(),
            &config.storage.access_token_key,
            &config.storage.refresh_token_key,
        );

        Ok(Self::new(Arc::new(api), Arc::new(store))
            .with_check_timeout(config.api.timeout_seconds.saturating_mul(2_000)))
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Exchange `refresh_token` and persist the new pair; returns the new
    /// access token
    async fn refresh_tokens(&self, refresh_token: &str) -> AuthResult<String> {
        let tokens = self.api.refresh(refresh_token).await?;
        self.store.save(&tokens).await?;
        Ok(tokens.access)
    }

    /// Refresh if only a refresh token is stored, then fetch the profile.
    ///
    /// At most one refresh call is made and it always precedes the profile
    /// fetch; a failed refresh stops the sequence. A rejected access token is
    /// not retried.
    async fn resolve_profile(&self) -> AuthResult<UserProfile> {
        let stored = self.store.load().await?;

        let access_token = match (stored.access_token, stored.refresh_token) {
            (Some(access), _) => access,
            (None, Some(refresh)) => {
                debug!("No access token stored, refreshing");
                self.refresh_tokens(&refresh).await?
            }
            (None, None) => return Err(AuthError::Authentication),
        };

        self.api.profile(&access_token).await
    }

    /// Run an authenticated request with the stored access token.
    ///
    /// `request` receives the bearer token to send. If only a refresh token is
    /// stored, it is exchanged first. If the backend rejects the access token
    /// (`AuthError::Authentication`), the refresh token is exchanged once and
    /// the request retried once with the new access token. A failed refresh
    /// clears both stored tokens and returns the refresh error.
    pub async fn authorized<T, F, Fut>(&self, mut request: F) -> AuthResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = AuthResult<T>>,
    {
        let stored = self.store.load().await?;

        let (access_token, refreshed) =
            match (stored.access_token, stored.refresh_token.as_deref()) {
                (Some(access), _) => (access, false),
                (None, Some(refresh)) => (self.refresh_or_clear(refresh).await?, true),
                (None, None) => return Err(AuthError::Authentication),
            };

        match request(access_token).await {
            Err(AuthError::Authentication) if !refreshed => {
                let Some(refresh) = stored.refresh_token else {
                    return Err(AuthError::Authentication);
                };
                debug!("Access token rejected, refreshing once");
                let access_token = self.refresh_or_clear(&refresh).await?;
                request(access_token).await
            }
            result => result,
        }
    }

    async fn refresh_or_clear(&self, refresh_token: &str) -> AuthResult<String> {
        match self.refresh_tokens(refresh_token).await {
            Ok(access) => Ok(access),
            Err(e) => {
                e.log("refresh");
                if let Err(clear_error) = self.store.clear().await {
                    clear_error.log("refresh.clear");
                }
                Err(e)
            }
        }
    }

    /// Silent check run when a public auth page mounts.
    ///
    /// Never fails: every error means "render the page".
    pub async fn check_existing_session(&self) -> RedirectDecision {
        match measure_async("check_existing_session", self.resolve_profile()).await {
            Ok(profile) => {
                let target = role_to_path(profile.role).to_string();
                info!(role = %profile.role, target = %target, "Existing session found");
                RedirectDecision::Redirect(target)
            }
            Err(AuthError::Authentication) => {
                debug!("No valid session, rendering page");
                RedirectDecision::Render
            }
            Err(e) => {
                e.log("check_existing_session");
                RedirectDecision::Render
            }
        }
    }

    /// Profile for the stored session, refreshing when needed
    pub async fn current_user(&self) -> AuthResult<UserProfile> {
        self.authorized(move |access| async move { self.api.profile(&access).await })
            .await
    }

    /// Guard for a protected page at `path`
    pub async fn require_session(&self, path: &str) -> GuardDecision {
        match self.current_user().await {
            Ok(profile) if routes::can_access(profile.role, path) => GuardDecision::Allow(profile),
            Ok(profile) => {
                warn!(role = %profile.role, path = path, "Route belongs to another role");
                GuardDecision::Redirect(routes::UNAUTHORIZED.to_string())
            }
            Err(e) => {
                e.log("require_session");
                if let Err(clear_error) = self.store.clear().await {
                    clear_error.log("require_session.clear");
                }
                GuardDecision::Redirect(routes::login_with_redirect(path))
            }
        }
    }

    /// Email/password login.
    ///
    /// Validation failures return before any request. Tokens are persisted
    /// before success is reported; on failure the store is left untouched.
    /// `redirect_param` is the page's explicit `?redirect=` value, which
    /// takes precedence over the backend's `redirect_url`.
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
        redirect_param: Option<&str>,
    ) -> AuthResult<AuthenticatedUser> {
        validation::validate_login(credentials)?;
        log_operation_start!("login", role = %credentials.role);

        let response = measure_async("login", self.api.login(credentials))
            .await
            .inspect_err(|e| e.log("login"))?;

        self.store.save(&response.tokens).await?;

        let redirect_to = resolve_redirect(
            redirect_param,
            response.redirect_url.as_deref(),
            response.user.role,
        );

        if response.user.role != credentials.role {
            debug!(
                selected = %credentials.role,
                actual = %response.user.role,
                "Backend accepted login under a different role"
            );
        }

        log_operation_success!("login", role = %response.user.role, target = %redirect_to);

        Ok(AuthenticatedUser {
            user: response.user,
            redirect_to,
        })
    }

    /// Sign out; returns the path to navigate to.
    ///
    /// The backend call is best-effort and only made when a refresh token is
    /// stored. Local tokens are cleared whatever happens to it.
    pub async fn logout(&self) -> String {
        match self.store.load().await {
            Ok(stored) if stored.refresh_token.is_some() => {
                // Reload per attempt: a refresh in between rotates the token
                let result = self
                    .authorized(move |access| async move {
                        let refresh = self
                            .store
                            .load()
                            .await?
                            .refresh_token
                            .ok_or(AuthError::Authentication)?;
                        self.api.logout(&access, &refresh).await
                    })
                    .await;

                if let Err(e) = result {
                    warn!(error = %e, "Backend logout failed, clearing local session anyway");
                }
            }
            Ok(_) => {}
            Err(e) => e.log("logout.load"),
        }

        if let Err(e) = self.store.clear().await {
            e.log("logout.clear");
        }

        info!("Signed out");
        routes::LOGIN.to_string()
    }

    /// Ask for a reset email
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        validation::validate_reset_email(email)?;
        self.api
            .request_password_reset(email.trim())
            .await
            .inspect_err(|e| e.log("request_password_reset"))
    }

    /// Set a new password from a reset link.
    ///
    /// A link without uid or token is rejected before any request.
    pub async fn confirm_password_reset(
        &self,
        link: &ResetLink,
        new_password: &str,
        confirmation: &str,
    ) -> AuthResult<()> {
        let (uid, token) = link.parts().ok_or(AuthError::InvalidResetLink)?;
        validation::validate_new_password(new_password, confirmation)?;

        let request = PasswordResetConfirm {
            uid: uid.to_string(),
            token: token.to_string(),
            new_password1: new_password.to_string(),
            new_password2: confirmation.to_string(),
        };

        self.api
            .confirm_password_reset(&request)
            .await
            .inspect_err(|e| e.log("confirm_password_reset"))
    }
}
