//! Post-authentication redirect rules
//!
//! Precedence is fixed: an explicit redirect parameter (e.g. `?redirect=`)
//! wins over the backend's `redirect_url`, which wins over the role's
//! dashboard. Only same-site relative paths are honoured from the first two
//! sources.

use crate::routes;
use crate::types::Role;
use tracing::debug;

/// Dashboard path for a role
pub fn role_to_path(role: Role) -> &'static str {
    match role {
        Role::Student => routes::STUDENT_DASHBOARD,
        Role::Trainer => routes::TRAINER_DASHBOARD,
        Role::Admin => routes::ADMIN_DASHBOARD,
        Role::Superadmin => routes::SUPERADMIN_DASHBOARD,
    }
}

/// Pick the navigation target after a successful login
pub fn resolve_redirect(explicit: Option<&str>, backend: Option<&str>, role: Role) -> String {
    for (source, candidate) in [("explicit", explicit), ("backend", backend)] {
        let Some(candidate) = candidate.map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };

        if is_safe_relative_path(candidate) {
            return candidate.to_string();
        }

        debug!(
            source = source,
            target = candidate,
            "Ignoring redirect target outside this site"
        );
    }

    role_to_path(role).to_string()
}

/// True for paths such as `/student/dashboard?tab=1`; false for absolute or
/// protocol-relative URLs and anything a browser could resolve off-site
pub fn is_safe_relative_path(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.contains('\\')
        && !target.chars().any(char::is_control)
        && !target
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .contains("://")
}
