use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use realty_desk::client::{ApiClient, ApiError};
use realty_desk::config::AppConfig;
use realty_desk::error::AppError;
use realty_desk::navigation::{guard, AppShell, GuardDecision, LOGIN_ROUTE};
use realty_desk::session::{self, FileSessionStore};
use realty_desk::telemetry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs: the shell around an authenticated client
/// whose tokens live in the configured session file.
pub(crate) struct Context {
    pub(crate) shell: AppShell,
    pub(crate) session_path: PathBuf,
}

impl Context {
    pub(crate) fn load() -> Result<Self, AppError> {
        let config = AppConfig::load()?;
        telemetry::init(&config.telemetry)?;

        let store = Arc::new(FileSessionStore::open(&config.session.path)?);
        let client = ApiClient::new(config.api.clone(), store)?;
        debug!(
            environment = ?config.environment,
            base_url = %client.base_url(),
            session = %config.session.path.display(),
            "client ready"
        );

        Ok(Self {
            shell: AppShell::new(client),
            session_path: config.session.path,
        })
    }

    pub(crate) fn client(&self) -> ApiClient {
        self.shell.client().clone()
    }

    /// Enters a protected route. An expired access token is fine as long as a
    /// refresh token is around to renew it; with neither the command stops
    /// before touching the network.
    pub(crate) fn enter(&self, route: &str) -> Result<(), AppError> {
        let store = self.shell.client().store().clone();
        match guard::check(store.as_ref(), route, Utc::now()) {
            GuardDecision::Allow => {
                self.shell.navigate(route, Utc::now());
                Ok(())
            }
            GuardDecision::RedirectToLogin { from } => {
                if session::refresh_token(store.as_ref()).is_some() {
                    debug!(route = %from, "access token stale; relying on refresh");
                    return Ok(());
                }
                self.shell.navigate(route, Utc::now());
                Err(ApiError::Unauthenticated.into())
            }
        }
    }

    /// Reports a session the backend ended while the command ran.
    pub(crate) fn settle(&self) {
        if self.shell.process_events() {
            let interrupted = self.shell.return_to().unwrap_or_default();
            eprintln!(
                "Session expired while on {interrupted}; run `realty-desk login` to continue ({LOGIN_ROUTE})."
            );
        }
    }
}

/// Accepts RFC 3339 (`2025-06-01T09:30:00+03:00`) or a local
/// `YYYY-MM-DD HH:MM` wall-clock time.
pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD HH:MM ({err})"))?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("'{raw}' is ambiguous or skipped in the local timezone"))
}
