//! Session and account data shapes exchanged with the backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account classification that decides which dashboard applies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Trainer,
    Admin,
    Superadmin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Student, Role::Trainer, Role::Admin, Role::Superadmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Trainer => "trainer",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    /// Dashboard this role lands on
    pub fn dashboard_path(&self) -> &'static str {
        crate::redirect::role_to_path(*self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "trainer" => Ok(Role::Trainer),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Access/refresh bearer token pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Tokens are credentials; keep them out of debug output and logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Whatever the session store currently holds
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl From<TokenPair> for StoredSession {
    fn from(tokens: TokenPair) -> Self {
        Self {
            access_token: Some(tokens.access),
            refresh_token: Some(tokens.refresh),
        }
    }
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Profile returned by the backend for an access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The backend sends numeric primary keys; older endpoints send strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
        Missing(Option<()>),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
        Id::Missing(_) => String::new(),
    })
}

/// Email/password credentials plus the role picked on the login surface
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    /// Client-side hint only; the backend decides the real role
    pub role: Role,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
            role,
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Successful `POST /users/login/` body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserProfile,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Successful `POST /users/refresh/` body; the refresh token is only
/// present when the backend rotates it
#[derive(Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl RefreshResponse {
    /// Combine with the refresh token that was exchanged
    pub fn into_tokens(self, previous_refresh: &str) -> TokenPair {
        TokenPair {
            access: self.access,
            refresh: self
                .refresh
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| previous_refresh.to_string()),
        }
    }
}

/// Body of `POST /auth/password/reset/confirm/`
#[derive(Clone, Serialize)]
pub struct PasswordResetConfirm {
    pub uid: String,
    pub token: String,
    pub new_password1: String,
    pub new_password2: String,
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user: UserProfile,
    /// Where the caller should navigate next
    pub redirect_to: String,
}

impl AuthenticatedUser {
    pub fn role(&self) -> Role {
        self.user.role
    }
}

/// Outcome of the silent session check on a public auth page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// A valid session exists; leave the page for this path
    Redirect(String),
    /// No usable session; render the page normally
    Render,
}

/// Outcome of guarding a protected page
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Allow(UserProfile),
    Redirect(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parsing_and_display() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(role.to_string(), role.as_str());
        }
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("instructor".parse::<Role>().is_err());
    }

    #[test]
    fn test_profile_accepts_numeric_and_string_ids() {
        let numeric: UserProfile = serde_json::from_value(json!({
            "id": 42,
            "email": "ada@example.com",
            "name": "Ada",
            "role": "trainer",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(numeric.id, "42");
        assert_eq!(numeric.role, Role::Trainer);
        assert!(numeric.created_at.is_some());

        let text: UserProfile = serde_json::from_value(json!({
            "id": "u-7",
            "email": "sam@example.com",
            "name": "Sam",
            "role": "superadmin"
        }))
        .unwrap();
        assert_eq!(text.id, "u-7");
        assert_eq!(text.role, Role::Superadmin);
        assert!(text.created_at.is_none());
    }

    #[test]
    fn test_login_response_with_partial_user() {
        let response: LoginResponse = serde_json::from_value(json!({
            "access": "a",
            "refresh": "r",
            "user": { "role": "trainer" },
            "redirect_url": "/custom"
        }))
        .unwrap();

        assert_eq!(response.tokens, TokenPair::new("a", "r"));
        assert_eq!(response.user.role, Role::Trainer);
        assert_eq!(response.user.id, "");
        assert_eq!(response.redirect_url.as_deref(), Some("/custom"));
    }

    #[test]
    fn test_refresh_keeps_previous_token_without_rotation() {
        let rotated: RefreshResponse =
            serde_json::from_value(json!({ "access": "a2", "refresh": "r2" })).unwrap();
        assert_eq!(rotated.into_tokens("r1"), TokenPair::new("a2", "r2"));

        let access_only: RefreshResponse =
            serde_json::from_value(json!({ "access": "a2" })).unwrap();
        assert_eq!(access_only.into_tokens("r1"), TokenPair::new("a2", "r1"));
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let tokens = TokenPair::new("secret-access", "secret-refresh");
        let rendered = format!("{:?}", tokens);
        assert!(!rendered.contains("secret"));

        let credentials = LoginCredentials::new("a@b.co", "hunter22", Role::Student);
        assert!(!format!("{:?}", credentials).contains("hunter22"));
    }
}
