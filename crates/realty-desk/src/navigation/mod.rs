//! Route guard and the application shell that owns navigation.

pub mod guard;
pub mod shell;

pub use guard::{check, is_public, GuardDecision, DEFAULT_LANDING_ROUTE, LOGIN_ROUTE};
pub use shell::AppShell;
