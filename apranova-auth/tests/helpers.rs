//! Integration test helpers
//!
//! Spins up an in-process axum backend that speaks the auth endpoints, with
//! scripted responses and per-endpoint call counters.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

use apranova_auth::{HttpAuthApi, MemorySessionStore, SessionManager};
use apranova_core::ApiConfig;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

// Ensure tracing is only initialised once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

pub const LOGIN: &str = "login";
pub const REFRESH: &str = "refresh";
pub const PROFILE: &str = "profile";
pub const LOGOUT: &str = "logout";
pub const RESET: &str = "reset";
pub const RESET_CONFIRM: &str = "reset_confirm";

const ENDPOINTS: [&str; 6] = [LOGIN, REFRESH, PROFILE, LOGOUT, RESET, RESET_CONFIRM];

pub fn user_json(role: &str) -> Value {
    json!({
        "id": 7,
        "email": "ada@example.com",
        "name": "Ada Lovelace",
        "role": role,
        "created_at": "2024-09-01T08:30:00Z"
    })
}

/// Scripted backend state shared with the handlers
#[derive(Default)]
pub struct BackendState {
    counters: HashMap<&'static str, AtomicUsize>,
    responses: Mutex<HashMap<&'static str, (u16, Value)>>,
    bodies: Mutex<HashMap<&'static str, Value>>,
    authorizations: Mutex<HashMap<&'static str, Vec<Option<String>>>>,
    rejected_bearer: Mutex<Option<String>>,
}

impl BackendState {
    fn new() -> Self {
        let counters = ENDPOINTS
            .iter()
            .map(|endpoint| (*endpoint, AtomicUsize::new(0)))
            .collect();

        let responses = HashMap::from([
            (
                LOGIN,
                (
                    200,
                    json!({
                        "access": "access-1",
                        "refresh": "refresh-1",
                        "user": user_json("student")
                    }),
                ),
            ),
            (
                REFRESH,
                (200, json!({ "access": "access-2", "refresh": "refresh-2" })),
            ),
            (PROFILE, (200, user_json("student"))),
            (LOGOUT, (200, json!({}))),
            (
                RESET,
                (200, json!({ "detail": "Password reset e-mail has been sent." })),
            ),
            (
                RESET_CONFIRM,
                (200, json!({ "detail": "Password has been reset." })),
            ),
        ]);

        Self {
            counters,
            responses: Mutex::new(responses),
            ..Default::default()
        }
    }

    fn handle(&self, endpoint: &'static str, body: Option<Value>) -> Response {
        if let Some(counter) = self.counters.get(endpoint) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(body) = body {
            self.bodies.lock().unwrap().insert(endpoint, body);
        }
        self.scripted(endpoint)
    }

    /// Authenticated endpoint: records the bearer, 401 without one or for
    /// the rejected one
    fn handle_authenticated(
        &self,
        endpoint: &'static str,
        headers: &HeaderMap,
        body: Option<Value>,
    ) -> Response {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.authorizations
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push(authorization.clone());

        let rejected = self.rejected_bearer.lock().unwrap().clone();
        let accepted = match (&authorization, &rejected) {
            (None, _) => false,
            (Some(sent), Some(rejected)) => sent != rejected,
            (Some(_), None) => true,
        };

        if accepted {
            return self.handle(endpoint, body);
        }

        if let Some(counter) = self.counters.get(endpoint) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        (
            StatusCode::UNAUTHORIZED,
            [(header::CONTENT_TYPE, "application/json")],
            json!({ "detail": "Given token not valid for any token type" }).to_string(),
        )
            .into_response()
    }

    fn scripted(&self, endpoint: &'static str) -> Response {
        let (status, payload) = self
            .responses
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .unwrap_or((404, Value::Null));

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let text = match payload {
            Value::Null => String::new(),
            Value::String(raw) => raw,
            other => other.to_string(),
        };

        (status, [(header::CONTENT_TYPE, "application/json")], text).into_response()
    }
}

async fn login(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.handle(LOGIN, Some(body))
}

async fn refresh(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.handle(REFRESH, Some(body))
}

async fn profile(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.handle_authenticated(PROFILE, &headers, None)
}

async fn logout(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.handle_authenticated(LOGOUT, &headers, Some(body))
}

async fn reset(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.handle(RESET, Some(body))
}

async fn reset_confirm(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.handle(RESET_CONFIRM, Some(body))
}

/// Running mock backend
pub struct MockBackend {
    pub address: String,
    pub port: u16,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    /// Replace the response for one endpoint. `Value::String` is sent raw,
    /// `Value::Null` as an empty body.
    pub fn respond(&self, endpoint: &'static str, status: u16, body: Value) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(endpoint, (status, body));
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.state
            .counters
            .get(endpoint)
            .map(|counter| counter.load(Ordering::SeqCst))
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        ENDPOINTS.iter().map(|endpoint| self.calls(endpoint)).sum()
    }

    /// Last JSON body received on an endpoint
    pub fn last_body(&self, endpoint: &str) -> Option<Value> {
        self.state.bodies.lock().unwrap().get(endpoint).cloned()
    }

    /// Authorization headers received on an endpoint, oldest first
    pub fn authorizations(&self, endpoint: &str) -> Vec<Option<String>> {
        self.state
            .authorizations
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .unwrap_or_default()
    }

    /// Authorization header of the last request on an endpoint
    pub fn last_authorization(&self, endpoint: &str) -> Option<String> {
        self.authorizations(endpoint).pop().flatten()
    }

    /// Answer 401 on authenticated endpoints when this access token is sent
    pub fn reject_access_token(&self, token: &str) {
        *self.state.rejected_bearer.lock().unwrap() = Some(format!("Bearer {}", token));
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.address.clone(),
            timeout_seconds: 5,
            ..ApiConfig::default()
        }
    }

    /// Session manager talking to this backend, with tokens in memory
    pub fn manager(&self, store: MemorySessionStore) -> (SessionManager, Arc<MemorySessionStore>) {
        let api = HttpAuthApi::new(self.api_config()).expect("Failed to build API client");
        let store = Arc::new(store);
        (SessionManager::new(Arc::new(api), store.clone()), store)
    }
}

/// Start a mock backend on a random local port
pub async fn spawn_backend() -> MockBackend {
    LazyLock::force(&TRACING);

    let state = Arc::new(BackendState::new());
    let app = Router::new()
        .route("/api/users/login/", post(login))
        .route("/api/users/refresh/", post(refresh))
        .route("/api/users/profile/", get(profile))
        .route("/api/users/logout/", post(logout))
        .route("/api/auth/password/reset/", post(reset))
        .route("/api/auth/password/reset/confirm/", post(reset_confirm))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    info!("Mock backend listening on {}", address);

    MockBackend {
        address,
        port,
        state,
    }
}

/// Address on which nothing is listening
pub async fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
