//! Authenticated API client.
//!
//! Every call goes through [`ApiClient::request`], which attaches the stored
//! bearer token and recovers from a single 401 by refreshing the access token
//! and reissuing the request once. Refreshes are single-flight: concurrent
//! callers that hit an expired token share one refresh call. When recovery is
//! impossible the session is cleared and [`SessionEvent::Unauthenticated`] is
//! published; navigation is left to whoever subscribes.

pub mod error;
pub mod events;
mod refresh;
pub mod request;

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::session::{self, SessionStore, TokenPair, ACCESS_KEY, REFRESH_KEY};

pub use error::{ApiError, ValidationError};
pub use events::{SessionEvent, SessionEvents};
pub use request::{ApiRequest, ApiResponse};

use refresh::{RefreshCoordinator, RefreshOutcome};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Endpoints that mint credentials; a 401 from them is final.
fn is_auth_bootstrap(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    let path = path.trim_end_matches('/');
    path == LOGIN_PATH || path == REFRESH_PATH
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    password: &'a str,
}

impl<'a> LoginRequest<'a> {
    fn for_identity(identity: &'a str, password: &'a str) -> Self {
        if identity.contains('@') {
            Self {
                email: Some(identity),
                username: None,
                password,
            }
        } else {
            Self {
                email: None,
                username: Some(identity),
                password,
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest {
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

struct Inner {
    http: reqwest::Client,
    api: ApiConfig,
    store: Arc<dyn SessionStore>,
    events: SessionEvents,
    refresh: RefreshCoordinator,
    /// Serialises session teardown so one dead session yields one event.
    expiry: Mutex<()>,
}

/// Cheap to clone; clones share the session, the event channel and the
/// refresh guard.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.api.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(api: ApiConfig, store: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = api.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self::with_http(http, api, store))
    }

    pub fn with_http(http: reqwest::Client, api: ApiConfig, store: Arc<dyn SessionStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                api,
                store,
                events: SessionEvents::default(),
                refresh: RefreshCoordinator::default(),
                expiry: Mutex::new(()),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    pub fn base_url(&self) -> &str {
        &self.inner.api.base_url
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Sends `request` with the stored bearer token, refreshing and retrying
    /// at most once on 401.
    ///
    /// Responses are returned verbatim, including a final 401. Only transport
    /// and session store failures are errors.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let sent_with = session::access_token(self.inner.store.as_ref());
        let response = self.inner.dispatch(&request, sent_with.as_deref()).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }
        if request.anonymous || is_auth_bootstrap(&request.path) {
            debug!(path = %request.path, "401 on a credential-less call is final");
            return Ok(response);
        }

        let Some(token) = self.refresh_after(sent_with.as_deref()).await? else {
            self.expire_session(&request.path)?;
            return Ok(response);
        };

        let retried = self.inner.dispatch(&request, Some(&token)).await?;
        if retried.is_unauthorized() {
            self.expire_session(&request.path)?;
        }
        Ok(retried)
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// Returns `Ok(None)` when no refresh token is stored or the backend
    /// refuses it; the store is left untouched in that case.
    pub async fn refresh(&self) -> Result<Option<String>, ApiError> {
        let inner = self.inner.clone();
        self.inner
            .refresh
            .run(move || refresh_once(inner).boxed())
            .await
    }

    /// Posts credentials to the login endpoint. `identity` is sent as an email
    /// when it contains `@`, otherwise as a username.
    ///
    /// Only a 401 means [`ApiError::InvalidCredentials`]. Any other non-2xx,
    /// such as a 400 for a missing field, is [`ApiError::Rejected`] with the
    /// body, and a 5xx is never reported as bad credentials.
    pub async fn login(&self, identity: &str, password: &str) -> Result<TokenPair, ApiError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(ValidationError::Missing { field: "identity" }.into());
        }
        if password.is_empty() {
            return Err(ValidationError::Missing { field: "password" }.into());
        }

        let body = LoginRequest::for_identity(identity, password);
        let response = self
            .request(ApiRequest::post(LOGIN_PATH).anonymous().json(&body)?)
            .await?;

        if response.is_unauthorized() {
            self.inner.store.remove(ACCESS_KEY)?;
            return Err(ApiError::InvalidCredentials);
        }
        let pair: TokenPair = expect_success(response)?.json()?;
        info!("signed in");
        Ok(pair)
    }

    /// Sends `request` and decodes a successful JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.request(request).await?;
        expect_success(response)?.json()
    }

    /// Sends `request` and discards a successful body.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        let response = self.request(request).await?;
        expect_success(response).map(|_| ())
    }

    async fn refresh_after(&self, stale: Option<&str>) -> RefreshOutcome {
        if let Some(current) = session::access_token(self.inner.store.as_ref()) {
            if Some(current.as_str()) != stale {
                debug!("access token already replaced; reusing it");
                return Ok(Some(current));
            }
        }
        self.refresh().await
    }

    /// Clears the session and announces it, once per session: callers that
    /// lose the race to a concurrent teardown find the store already empty.
    fn expire_session(&self, path: &str) -> Result<(), ApiError> {
        let _teardown = self.inner.expiry.lock().expect("expiry mutex poisoned");
        let store = self.inner.store.as_ref();
        if session::access_token(store).is_none() && session::refresh_token(store).is_none() {
            debug!(%path, "401 after the session already ended");
            return Ok(());
        }

        warn!(%path, "unrecoverable 401; clearing session");
        store.clear()?;
        self.inner.events.publish(SessionEvent::Unauthenticated {
            path: path.to_string(),
        });
        Ok(())
    }
}

/// Maps a final response to the error taxonomy: 401 means the session is
/// gone, any other non-2xx is handed back with its body for display.
pub fn expect_success(response: ApiResponse) -> Result<ApiResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    if response.status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthenticated);
    }
    Err(ApiError::Rejected {
        status: response.status.as_u16(),
        body: response.text(),
    })
}

impl Inner {
    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.api.url(&request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let (Some(token), false) = (token, request.anonymous) {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = ApiResponse::read(builder.send().await?).await?;
        debug!(method = %request.method, %url, status = response.status.as_u16(), "dispatched");
        Ok(response)
    }
}

async fn refresh_once(inner: Arc<Inner>) -> RefreshOutcome {
    let Some(refresh) = session::refresh_token(inner.store.as_ref()) else {
        debug!("no refresh token stored");
        return Ok(None);
    };

    let request = ApiRequest::post(REFRESH_PATH)
        .anonymous()
        .json(&RefreshRequest { refresh })?;
    let response = inner.dispatch(&request, None).await?;
    if !response.is_success() {
        warn!(status = response.status.as_u16(), "refresh rejected");
        return Ok(None);
    }

    let body: RefreshResponse = response.json()?;
    inner.store.set(ACCESS_KEY, &body.access)?;
    if let Some(rotated) = body.refresh.as_deref() {
        inner.store.set(REFRESH_KEY, rotated)?;
    }
    inner.events.publish(SessionEvent::Refreshed);
    info!(rotated = body.refresh.is_some(), "access token refreshed");
    Ok(Some(body.access))
}
