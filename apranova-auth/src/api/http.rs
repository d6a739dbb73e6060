//! reqwest implementation of the backend API

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use super::{
    create_http_client, endpoints, handle_response_error, transport_error, AuthApi,
};
use crate::error::{AuthError, AuthResult};
use crate::types::{
    LoginCredentials, LoginResponse, PasswordResetConfirm, RefreshResponse, TokenPair,
    UserProfile,
};
use apranova_core::ApiConfig;

/// HTTP client for the authentication endpoints
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpAuthApi {
    /// Create a new client
    pub fn new(config: ApiConfig) -> AuthResult<Self> {
        let client = create_http_client(&config)?;

        info!(
            "Created auth API client for {}",
            config.endpoint("")
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// GET an authenticated endpoint and decode its JSON body.
    ///
    /// Pair with [`SessionManager::authorized`](crate::SessionManager::authorized)
    /// to get a single refresh-and-retry when the access token is rejected.
    pub async fn get_authorized<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> AuthResult<T> {
        let url = self.config.endpoint(path);
        debug!(operation = path, "GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| transport_error(e, path))?;

        let response = Self::check_status(response, path).await?;
        Self::decode(response, path).await
    }

    async fn post_json<B>(
        &self,
        path: &str,
        body: &B,
        access_token: Option<&str>,
        operation: &str,
    ) -> AuthResult<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.config.endpoint(path);
        debug!(operation = operation, "POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, operation))?;

        Self::check_status(response, operation).await
    }

    async fn check_status(response: reqwest::Response, operation: &str) -> AuthResult<reqwest::Response> {
        if !response.status().is_success() {
            return Err(handle_response_error(response, operation).await);
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, operation: &str) -> AuthResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, operation))?;

        serde_json::from_slice(&bytes).map_err(|e| AuthError::UnexpectedResponse {
            message: format!("{} returned an unexpected body: {}", operation, e),
        })
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &LoginCredentials) -> AuthResult<LoginResponse> {
        let response = self
            .post_json(endpoints::LOGIN, credentials, None, "login")
            .await?;
        Self::decode(response, "login").await
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let response = self
            .post_json(
                endpoints::REFRESH,
                &json!({ "refresh": refresh_token }),
                None,
                "refresh",
            )
            .await?;
        let refreshed: RefreshResponse = Self::decode(response, "refresh").await?;
        Ok(refreshed.into_tokens(refresh_token))
    }

    async fn profile(&self, access_token: &str) -> AuthResult<UserProfile> {
        self.get_authorized(endpoints::PROFILE, access_token).await
    }

    async fn logout(&self, access_token: &str, refresh_token: &str) -> AuthResult<()> {
        self.post_json(
            endpoints::LOGOUT,
            &json!({ "refresh": refresh_token }),
            Some(access_token),
            "logout",
        )
        .await?;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        self.post_json(
            endpoints::PASSWORD_RESET,
            &json!({ "email": email }),
            None,
            "password_reset",
        )
        .await?;
        Ok(())
    }

    async fn confirm_password_reset(&self, request: &PasswordResetConfirm) -> AuthResult<()> {
        self.post_json(
            endpoints::PASSWORD_RESET_CONFIRM,
            request,
            None,
            "password_reset_confirm",
        )
        .await?;
        Ok(())
    }
}
