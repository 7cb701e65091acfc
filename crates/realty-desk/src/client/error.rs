use std::sync::Arc;

use crate::session::SessionError;

/// Failure surfaced by the API client and the typed resource APIs.
///
/// Cloneable so a single refresh outcome can be handed to every caller that
/// waited on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(#[source] Arc<reqwest::Error>),
    #[error("session expired; sign in again")]
    Unauthenticated,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Decode(#[source] Arc<serde_json::Error>),
    #[error("session store failure: {0}")]
    Session(#[source] Arc<SessionError>),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The account exists but the follow-up login did not go through.
    #[error("account created, but sign-in failed: {0}")]
    RegisteredButSignInFailed(#[source] Box<ApiError>),
}

impl ApiError {
    /// Body text of a rejected request, for field-level display.
    pub fn rejection_body(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(Arc::new(value))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(Arc::new(value))
    }
}

impl From<SessionError> for ApiError {
    fn from(value: SessionError) -> Self {
        Self::Session(Arc::new(value))
    }
}

/// Input rejected locally before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
