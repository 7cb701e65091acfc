use chrono::{DateTime, Utc};

use crate::session::{self, SessionStore, TokenState};

pub const LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_LANDING_ROUTE: &str = "/dashboard";

/// Routes reachable without a session.
const PUBLIC_ROUTES: [&str; 5] = [
    LOGIN_ROUTE,
    "/register",
    "/verify-email",
    "/forgot-password",
    "/reset-password",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Send the user to sign in, remembering where they were headed.
    RedirectToLogin { from: String },
}

pub fn is_public(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    PUBLIC_ROUTES.contains(&path)
}

/// Client-side gate for protected routes, driven by the stored access token's
/// `exp` claim. Expired or malformed tokens count as no session.
pub fn check(store: &dyn SessionStore, path: &str, now: DateTime<Utc>) -> GuardDecision {
    if is_public(path) {
        return GuardDecision::Allow;
    }

    let state = session::access_token(store)
        .map(|token| session::inspect(&token, now))
        .unwrap_or(TokenState::Malformed);

    if state.is_valid() {
        GuardDecision::Allow
    } else {
        GuardDecision::RedirectToLogin {
            from: path.to_string(),
        }
    }
}
