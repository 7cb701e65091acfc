//! Session state shared by the API client, the route guard and the shell.

pub mod store;
pub mod token;

use serde::{Deserialize, Serialize};

pub use store::{
    FileSessionStore, MemorySessionStore, SessionError, SessionStore, ACCESS_KEY, REFRESH_KEY,
};
pub use token::{inspect, TokenState};

/// Access and refresh tokens as issued by the login and verification endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn access_token(store: &dyn SessionStore) -> Option<String> {
    store.get(ACCESS_KEY).filter(|token| !token.is_empty())
}

pub fn refresh_token(store: &dyn SessionStore) -> Option<String> {
    store.get(REFRESH_KEY).filter(|token| !token.is_empty())
}

/// Writes both tokens of a freshly issued pair.
pub fn store_credentials(store: &dyn SessionStore, pair: &TokenPair) -> Result<(), SessionError> {
    store.set(ACCESS_KEY, &pair.access)?;
    store.set(REFRESH_KEY, &pair.refresh)
}
