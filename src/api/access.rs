//! Route access policy and the gate that enforces it
//!
//! Every request under `/api/v1` is matched once against [`RULES`] (first
//! match wins). The gate verifies the bearer credential when the route needs
//! one, checks the role, and stores the [`Identity`] in the request
//! extensions for handlers to pick up.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    error::{AppError, AppResult},
    models::user::{Identity, Role},
    AppState,
};

/// What a route requires from the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    AnyOf(&'static [Role]),
}

pub struct Rule {
    /// `None` matches every method
    pub method: Option<Method>,
    /// `*` matches one path segment, a trailing `**` matches the rest (including nothing)
    pub pattern: &'static str,
    pub access: Access,
}

const ADMIN: &[Role] = &[Role::Admin];
const PRIVILEGED: &[Role] = &[Role::Admin, Role::Staff];

pub const RULES: &[Rule] = &[
    Rule { method: None, pattern: "/health", access: Access::Public },
    Rule { method: None, pattern: "/ready", access: Access::Public },
    Rule { method: Some(Method::GET), pattern: "/equipment/**", access: Access::Public },
    Rule { method: None, pattern: "/equipment/**", access: Access::AnyOf(ADMIN) },
    Rule { method: Some(Method::POST), pattern: "/requests", access: Access::Authenticated },
    Rule { method: Some(Method::GET), pattern: "/requests", access: Access::Authenticated },
    Rule { method: None, pattern: "/requests/*/status", access: Access::AnyOf(PRIVILEGED) },
    Rule { method: None, pattern: "/approvals/**", access: Access::AnyOf(PRIVILEGED) },
];

/// Fallback when no rule matches
const DEFAULT_ACCESS: Access = Access::Authenticated;

const API_PREFIX: &str = "/api/v1";

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut path_segments = path.trim_matches('/').split('/').filter(|s| !s.is_empty());
    let mut pattern_segments = pattern.trim_matches('/').split('/');

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (Some("**"), _) => return true,
            (Some("*"), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Look up the access rule for a method and path
pub fn required_access(method: &Method, path: &str) -> Access {
    let path = path.strip_prefix(API_PREFIX).unwrap_or(path);
    RULES
        .iter()
        .find(|rule| {
            rule.method.as_ref().map_or(true, |m| m == method) && pattern_matches(rule.pattern, path)
        })
        .map(|rule| rule.access)
        .unwrap_or(DEFAULT_ACCESS)
}

/// Decide whether `identity` satisfies `access`
pub fn authorize(access: Access, identity: Option<&Identity>) -> AppResult<()> {
    match (access, identity) {
        (Access::Public, _) => Ok(()),
        (_, None) => Err(AppError::Authentication(
            "Missing or invalid credential".to_string(),
        )),
        (Access::Authenticated, Some(_)) => Ok(()),
        (Access::AnyOf(roles), Some(identity)) if roles.contains(&identity.role) => Ok(()),
        (Access::AnyOf(_), Some(identity)) => Err(AppError::Authorization(format!(
            "Role {} may not access this resource",
            identity.role
        ))),
    }
}

/// Middleware enforcing [`RULES`] before any handler runs
pub async fn enforce(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let access = required_access(request.method(), request.uri().path());

    if access != Access::Public {
        let identity = match request.headers().typed_get::<Authorization<Bearer>>() {
            Some(Authorization(bearer)) => Some(state.services.auth.verify(bearer.token()).await?),
            None => None,
        };

        if let Err(e) = authorize(access, identity.as_ref()) {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                error = %e,
                "Access denied"
            );
            return Err(e);
        }

        if let Some(identity) = identity {
            request.extensions_mut().insert(identity);
        }
    }

    Ok(next.run(request).await)
}
