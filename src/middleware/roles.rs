use axum::{
    Json,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::metrics::DENIED_TOTAL;
use crate::middleware::identity;

// Endpoints that require an admin or moderator identity
const PROTECTED_PREFIXES: [&str; 1] = ["/api/admin"];

const ALLOWED_ROLES: [&str; 2] = ["admin", "moderator"];

fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

fn role_allowed(role: Option<&str>) -> bool {
    role.is_some_and(|role| ALLOWED_ROLES.contains(&role))
}

// Checks the caller's role before protected endpoints are served
pub async fn require_role(req: Request, next: Next) -> Response {
    if is_protected(req.uri().path()) {
        let Some(user) = identity::username(req.headers()) else {
            DENIED_TOTAL.inc();
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Authentication required",
                    "message": "You must be logged in to access this resource",
                })),
            )
                .into_response();
        };

        let role = identity::role(req.headers());
        if !role_allowed(role) {
            DENIED_TOTAL.inc();
            tracing::warn!(user, path = req.uri().path(), "role check failed");
            return (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "Access denied",
                    "message": "You do not have permission to access this resource",
                    "required_roles": ALLOWED_ROLES,
                    "your_role": role,
                })),
            )
                .into_response();
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_prefix_is_protected() {
        assert!(is_protected("/api/admin"));
        assert!(is_protected("/api/admin/stats"));
        assert!(!is_protected("/api/messages"));
        assert!(!is_protected("/health"));
    }

    #[test]
    fn only_admin_and_moderator_roles_pass() {
        assert!(role_allowed(Some("admin")));
        assert!(role_allowed(Some("moderator")));
        assert!(!role_allowed(Some("guest")));
        assert!(!role_allowed(Some("Admin")));
        assert!(!role_allowed(None));
    }
}
