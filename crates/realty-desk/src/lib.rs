//! Client library for the realty-desk listing backend.
//!
//! [`client::ApiClient`] is the core: bearer attachment, one transparent
//! refresh-and-retry per request, and single-flight refresh across concurrent
//! calls. The resource modules are typed wrappers over it, and
//! [`navigation::AppShell`] turns unrecoverable 401s into a redirect to the
//! sign-in view.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod navigation;
pub mod properties;
pub mod session;
pub mod showings;
pub mod telemetry;
