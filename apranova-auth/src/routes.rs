//! Application route table

use crate::types::Role;

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const SIGNUP: &str = "/signup";
pub const LOGOUT: &str = "/logout";
pub const RESET_PASSWORD: &str = "/reset-password";
pub const RESET_PASSWORD_CONFIRM: &str = "/reset-password/confirm";
pub const UNAUTHORIZED: &str = "/unauthorized";
pub const AUTH_CALLBACK: &str = "/auth/callback";

pub const STUDENT_DASHBOARD: &str = "/student/dashboard";
pub const TRAINER_DASHBOARD: &str = "/trainer/dashboard";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
pub const SUPERADMIN_DASHBOARD: &str = "/superadmin/dashboard";

/// Pages reachable without a session; the silent session check runs on these
pub const PUBLIC_ROUTES: [&str; 4] = [LOGIN, SIGNUP, RESET_PASSWORD, AUTH_CALLBACK];

/// Protected areas and the role that owns each
const ROLE_AREAS: [(&str, Role); 4] = [
    ("/student", Role::Student),
    ("/trainer", Role::Trainer),
    ("/admin", Role::Admin),
    ("/superadmin", Role::Superadmin),
];

/// Strip query string and fragment
fn path_only(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Whether `path` is one of the public auth pages (or nested below one)
pub fn is_public_route(path: &str) -> bool {
    let path = path_only(path);
    PUBLIC_ROUTES.iter().any(|route| under(path, route))
}

/// Role whose area contains `path`, if the path is protected
pub fn area_role(path: &str) -> Option<Role> {
    let path = path_only(path);
    ROLE_AREAS
        .iter()
        .find(|(prefix, _)| under(path, prefix))
        .map(|(_, role)| *role)
}

/// Whether `path` needs a signed-in user
pub fn is_protected_route(path: &str) -> bool {
    area_role(path).is_some()
}

/// Whether a user with `role` may open `path`
pub fn can_access(role: Role, path: &str) -> bool {
    match area_role(path) {
        Some(owner) => owner == role,
        None => true,
    }
}

/// Login URL that returns to `path` afterwards
pub fn login_with_redirect(path: &str) -> String {
    if path.is_empty() || path == HOME || is_public_route(path) {
        return LOGIN.to_string();
    }
    format!("{}?redirect={}", LOGIN, urlencoding::encode(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes() {
        assert!(is_public_route("/login"));
        assert!(is_public_route("/login?redirect=%2Fadmin"));
        assert!(is_public_route("/reset-password/confirm"));
        assert!(!is_public_route("/loginx"));
        assert!(!is_public_route("/student/dashboard"));
    }

    #[test]
    fn test_area_roles() {
        assert_eq!(area_role("/student/workspace"), Some(Role::Student));
        assert_eq!(area_role("/admin"), Some(Role::Admin));
        assert_eq!(area_role("/superadmin/dashboard"), Some(Role::Superadmin));
        assert_eq!(area_role("/administrator"), None);
        assert_eq!(area_role("/"), None);
        assert!(is_protected_route("/trainer/dashboard#today"));
    }

    #[test]
    fn test_access_by_role() {
        assert!(can_access(Role::Student, "/student/submit"));
        assert!(!can_access(Role::Student, "/admin/dashboard"));
        assert!(!can_access(Role::Admin, "/superadmin/dashboard"));
        assert!(can_access(Role::Trainer, "/pricing"));
    }

    #[test]
    fn test_login_with_redirect() {
        assert_eq!(
            login_with_redirect("/student/dashboard"),
            "/login?redirect=%2Fstudent%2Fdashboard"
        );
        assert_eq!(login_with_redirect("/"), "/login");
        assert_eq!(login_with_redirect("/login"), "/login");
    }
}
