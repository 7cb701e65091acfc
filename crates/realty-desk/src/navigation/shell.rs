use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{info, warn};

use super::guard::{self, GuardDecision, DEFAULT_LANDING_ROUTE, LOGIN_ROUTE};
use crate::client::{ApiClient, ApiError, SessionEvent};
use crate::session;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Location {
    current: String,
    return_to: Option<String>,
}

/// Top-level owner of the current route. It is the only place that reacts to
/// [`SessionEvent::Unauthenticated`] by moving to the sign-in view.
#[derive(Debug)]
pub struct AppShell {
    client: ApiClient,
    location: Mutex<Location>,
    events: Mutex<Receiver<SessionEvent>>,
}

impl AppShell {
    pub fn new(client: ApiClient) -> Self {
        let events = client.subscribe();
        Self {
            client,
            location: Mutex::new(Location {
                current: LOGIN_ROUTE.to_string(),
                return_to: None,
            }),
            events: Mutex::new(events),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn current(&self) -> String {
        self.location
            .lock()
            .expect("location mutex poisoned")
            .current
            .clone()
    }

    pub fn return_to(&self) -> Option<String> {
        self.location
            .lock()
            .expect("location mutex poisoned")
            .return_to
            .clone()
    }

    /// Moves to `path` if the guard allows it, otherwise to the sign-in view
    /// with `path` kept for after sign-in. Returns the resulting location.
    pub fn navigate(&self, path: &str, now: DateTime<Utc>) -> String {
        let decision = guard::check(self.client.store().as_ref(), path, now);
        let mut location = self.location.lock().expect("location mutex poisoned");
        match decision {
            GuardDecision::Allow => location.current = path.to_string(),
            GuardDecision::RedirectToLogin { from } => {
                location.current = LOGIN_ROUTE.to_string();
                location.return_to = Some(from);
            }
        }
        location.current.clone()
    }

    /// Logs in, stores both tokens and moves to the interrupted destination or
    /// the default landing route.
    pub async fn sign_in(&self, identity: &str, password: &str) -> Result<String, ApiError> {
        let pair = self.client.login(identity, password).await?;
        session::store_credentials(self.client.store().as_ref(), &pair)?;

        let mut location = self.location.lock().expect("location mutex poisoned");
        let target = location
            .return_to
            .take()
            .unwrap_or_else(|| DEFAULT_LANDING_ROUTE.to_string());
        location.current = target.clone();
        info!(%target, "signed in; resuming");
        Ok(target)
    }

    pub fn sign_out(&self) -> Result<(), ApiError> {
        self.client.store().clear()?;
        let mut location = self.location.lock().expect("location mutex poisoned");
        location.current = LOGIN_ROUTE.to_string();
        location.return_to = None;
        Ok(())
    }

    /// Drains pending session events. Returns `true` if the shell was sent to
    /// the sign-in view.
    pub fn process_events(&self) -> bool {
        let mut events = self.events.lock().expect("event mutex poisoned");
        let mut signed_out = false;
        loop {
            match events.try_recv() {
                Ok(SessionEvent::Unauthenticated { path }) => {
                    warn!(%path, "session ended by the backend");
                    self.redirect_to_login();
                    signed_out = true;
                }
                Ok(SessionEvent::Refreshed) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "session events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        signed_out
    }

    fn redirect_to_login(&self) {
        let mut location = self.location.lock().expect("location mutex poisoned");
        if location.current != LOGIN_ROUTE {
            location.return_to = Some(location.current.clone());
        }
        location.current = LOGIN_ROUTE.to_string();
    }
}
