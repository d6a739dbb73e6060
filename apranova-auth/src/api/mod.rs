//! Backend API client
//!
//! [`AuthApi`] is the seam between the session manager and the REST backend;
//! [`HttpAuthApi`] is the reqwest implementation.

use crate::error::{AuthError, AuthResult};
use crate::types::{LoginCredentials, LoginResponse, PasswordResetConfirm, TokenPair, UserProfile};
use apranova_core::{ApiConfig, ErrorContext};
use async_trait::async_trait;
use tracing::debug;

pub mod http;

#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpAuthApi;

/// Endpoint paths, relative to `<base_url><path_prefix>`
pub mod endpoints {
    pub const LOGIN: &str = "/users/login/";
    pub const REFRESH: &str = "/users/refresh/";
    pub const PROFILE: &str = "/users/profile/";
    pub const LOGOUT: &str = "/users/logout/";
    pub const PASSWORD_RESET: &str = "/auth/password/reset/";
    pub const PASSWORD_RESET_CONFIRM: &str = "/auth/password/reset/confirm/";
}

/// Calls the session manager makes against the backend
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token pair and the account
    async fn login(&self, credentials: &LoginCredentials) -> AuthResult<LoginResponse>;

    /// Exchange a refresh token for a new pair
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair>;

    /// Fetch the profile an access token belongs to
    async fn profile(&self, access_token: &str) -> AuthResult<UserProfile>;

    /// Invalidate a refresh token server-side. The endpoint only accepts
    /// authenticated callers, so the access token goes along as a bearer.
    async fn logout(&self, access_token: &str, refresh_token: &str) -> AuthResult<()>;

    /// Ask the backend to email a reset link
    async fn request_password_reset(&self, email: &str) -> AuthResult<()>;

    /// Set a new password using the uid/token from a reset link
    async fn confirm_password_reset(&self, request: &PasswordResetConfirm) -> AuthResult<()>;
}

/// Build the HTTP client with the global timeout and common headers
pub(crate) fn create_http_client(config: &ApiConfig) -> AuthResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let user_agent = reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
        AuthError::Core(apranova_core::CoreError::Config {
            message: format!("Invalid user agent: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
    })?;
    headers.insert(reqwest::header::USER_AGENT, user_agent);

    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| {
            AuthError::Core(apranova_core::CoreError::Config {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            })
        })
}

/// Map a transport failure (no usable response) to a network error
pub(crate) fn transport_error(error: reqwest::Error, operation: &str) -> AuthError {
    let message = if error.is_timeout() {
        format!("{} timed out", operation)
    } else if error.is_connect() {
        format!("{} could not connect", operation)
    } else {
        format!("{} failed: {}", operation, error)
    };

    AuthError::Network {
        message,
        source: Some(Box::new(error)),
    }
}

/// Turn a non-success response into the matching error variant
pub(crate) async fn handle_response_error(response: reqwest::Response, operation: &str) -> AuthError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    debug!(
        operation = operation,
        status = status,
        "Backend returned an error response"
    );

    AuthError::from_response(status, &body)
}
