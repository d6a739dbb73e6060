//! Client-side form validation
//!
//! Runs before any request is made; a failure here means zero network calls.

use crate::error::{AuthError, AuthResult, FieldErrors};
use crate::types::LoginCredentials;
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Basic `local@domain.tld` shape check
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Login form: email shape and minimum password length
pub fn validate_login(credentials: &LoginCredentials) -> AuthResult<()> {
    let mut errors = FieldErrors::new();

    if !is_valid_email(&credentials.email) {
        errors.insert("email".to_string(), "Valid email required".to_string());
    }
    if credentials.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.insert(
            "password".to_string(),
            format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::validation(errors))
    }
}

/// Password-reset request form
pub fn validate_reset_email(email: &str) -> AuthResult<()> {
    if is_valid_email(email.trim()) {
        Ok(())
    } else {
        let mut errors = FieldErrors::new();
        errors.insert(
            "email".to_string(),
            "Please enter a valid email address".to_string(),
        );
        Err(AuthError::validation(errors))
    }
}

/// Which strength rules a new password meets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordChecks {
    pub long_enough: bool,
    pub has_upper: bool,
    pub has_lower: bool,
    pub has_digit: bool,
}

impl PasswordChecks {
    pub fn evaluate(password: &str) -> Self {
        Self {
            long_enough: password.chars().count() >= MIN_PASSWORD_LENGTH,
            has_upper: password.chars().any(char::is_uppercase),
            has_lower: password.chars().any(char::is_lowercase),
            has_digit: password.chars().any(|c| c.is_ascii_digit()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.long_enough && self.has_upper && self.has_lower && self.has_digit
    }
}

/// New password plus its confirmation on the reset-confirm form
pub fn validate_new_password(password: &str, confirmation: &str) -> AuthResult<()> {
    let mut errors = FieldErrors::new();

    if !PasswordChecks::evaluate(password).is_valid() {
        errors.insert(
            "new_password".to_string(),
            "Password must be at least 8 characters and include uppercase, lowercase, and a number"
                .to_string(),
        );
    } else if password != confirmation {
        errors.insert(
            "confirm_password".to_string(),
            "Passwords do not match".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::validation(errors))
    }
}
