//! Scripted in-process backend for unit tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::AuthApi;
use crate::error::{AuthError, AuthResult};
use crate::types::{
    LoginCredentials, LoginResponse, PasswordResetConfirm, Role, TokenPair, UserProfile,
};

type Responder<T> = Box<dyn Fn() -> AuthResult<T> + Send + Sync>;
type ProfileResponder = Box<dyn Fn(&str) -> AuthResult<UserProfile> + Send + Sync>;

pub(crate) fn profile(role: Role) -> UserProfile {
    UserProfile {
        id: "1".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
        role,
        avatar: None,
        created_at: None,
    }
}

/// Records every call as `"<endpoint>:<argument>"`; logout as
/// `"logout:<access>:<refresh>"`
pub(crate) struct FakeApi {
    calls: Mutex<Vec<String>>,
    login: Responder<LoginResponse>,
    refresh: Responder<TokenPair>,
    profile: ProfileResponder,
    logout: Responder<()>,
    reset: Responder<()>,
    profile_gate: Option<Arc<Notify>>,
}

impl FakeApi {
    /// Everything succeeds; the profile belongs to `role`
    pub(crate) fn new(role: Role) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            login: Box::new(move || {
                Ok(LoginResponse {
                    tokens: TokenPair::new("login-access", "login-refresh"),
                    user: profile(role),
                    redirect_url: None,
                })
            }),
            refresh: Box::new(|| Ok(TokenPair::new("fresh-access", "fresh-refresh"))),
            profile: Box::new(move |_: &str| Ok(profile(role))),
            logout: Box::new(|| Ok(())),
            reset: Box::new(|| Ok(())),
            profile_gate: None,
        }
    }

    pub(crate) fn on_login(
        mut self,
        f: impl Fn() -> AuthResult<LoginResponse> + Send + Sync + 'static,
    ) -> Self {
        self.login = Box::new(f);
        self
    }

    pub(crate) fn on_refresh(
        mut self,
        f: impl Fn() -> AuthResult<TokenPair> + Send + Sync + 'static,
    ) -> Self {
        self.refresh = Box::new(f);
        self
    }

    /// Profile responder; receives the bearer token of each request
    pub(crate) fn on_profile(
        mut self,
        f: impl Fn(&str) -> AuthResult<UserProfile> + Send + Sync + 'static,
    ) -> Self {
        self.profile = Box::new(f);
        self
    }

    pub(crate) fn on_logout(mut self, f: impl Fn() -> AuthResult<()> + Send + Sync + 'static) -> Self {
        self.logout = Box::new(f);
        self
    }

    pub(crate) fn on_reset(mut self, f: impl Fn() -> AuthResult<()> + Send + Sync + 'static) -> Self {
        self.reset = Box::new(f);
        self
    }

    /// Hold profile requests until the returned handle is notified
    pub(crate) fn gate_profile(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.profile_gate = Some(gate.clone());
        (self, gate)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, endpoint: &str) -> usize {
        let prefix = format!("{}:", endpoint);
        self.calls()
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    fn record(&self, endpoint: &str, argument: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", endpoint, argument));
    }
}

pub(crate) fn unauthorized() -> AuthError {
    AuthError::from_response(401, "")
}

#[async_trait]
impl AuthApi for FakeApi {
    async fn login(&self, credentials: &LoginCredentials) -> AuthResult<LoginResponse> {
        self.record("login", &credentials.email);
        (self.login)()
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        self.record("refresh", refresh_token);
        (self.refresh)()
    }

    async fn profile(&self, access_token: &str) -> AuthResult<UserProfile> {
        self.record("profile", access_token);
        if let Some(gate) = &self.profile_gate {
            gate.notified().await;
        }
        (self.profile)(access_token)
    }

    async fn logout(&self, access_token: &str, refresh_token: &str) -> AuthResult<()> {
        self.record("logout", &format!("{}:{}", access_token, refresh_token));
        (self.logout)()
    }

    async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        self.record("reset", email);
        (self.reset)()
    }

    async fn confirm_password_reset(&self, request: &PasswordResetConfirm) -> AuthResult<()> {
        self.record("reset_confirm", &request.uid);
        (self.reset)()
    }
}
