//! Local expiry hint for JWT-shaped access tokens.
//!
//! The signature is never checked. The result only decides whether the client
//! bothers sending a request or sends the user to sign in first; the backend
//! stays the authority on token validity.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid { expires_at: DateTime<Utc> },
    Expired,
    Malformed,
}

impl TokenState {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenState::Valid { .. })
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Reads the `exp` claim of `token` and compares it to `now`.
pub fn inspect(token: &str, now: DateTime<Utc>) -> TokenState {
    let Some(exp) = expiry_claim(token) else {
        return TokenState::Malformed;
    };
    let Some(expires_at) = Utc.timestamp_opt(exp, 0).single() else {
        return TokenState::Malformed;
    };

    if expires_at <= now {
        TokenState::Expired
    } else {
        TokenState::Valid { expires_at }
    }
}

fn expiry_claim(token: &str) -> Option<i64> {
    let mut segments = token.trim().split('.');
    let (_header, payload) = (segments.next()?, segments.next()?);
    segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    Some(claim.exp)
}

#[cfg(test)]
pub(crate) fn forge(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"user_id":7}}"#));
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
