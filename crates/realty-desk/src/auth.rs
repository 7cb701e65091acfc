//! Account endpoints beyond login: registration with email-code verification,
//! password reset and the signed-in profile.

use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiError, ApiRequest, ValidationError};
use crate::session::{self, TokenPair};

pub const ME_PATH: &str = "/auth/me";
pub const REGISTER_PATH: &str = "/auth/register";
pub const VERIFY_PATH: &str = "/auth/register/verify";
pub const RESEND_PATH: &str = "/auth/register/resend";
pub const PASSWORD_FORGOT_PATH: &str = "/auth/password/forgot";
pub const PASSWORD_RESET_PATH: &str = "/auth/password/reset";

const MIN_PASSWORD_LEN: usize = 6;
const CODE_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    /// The backend keys accounts by email, so it doubles as the username.
    pub fn with_email(email: &str, password: &str) -> Self {
        let email = email.trim().to_string();
        Self {
            username: email.clone(),
            email,
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Serialize)]
struct EmailCode<'a> {
    email: &'a str,
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct EmailOnly<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct PasswordReset<'a> {
    email: &'a str,
    code: &'a str,
    new_password: &'a str,
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Missing { field: "email" });
    }
    if !email.contains('@') {
        return Err(ValidationError::Invalid {
            field: "email",
            reason: "must contain '@'",
        });
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Missing { field: "password" });
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::Invalid {
            field: "password",
            reason: "must be at least 6 characters",
        });
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Invalid {
            field: "password",
            reason: "must not be digits only",
        });
    }
    Ok(())
}

fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != CODE_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Invalid {
            field: "code",
            reason: "must be 6 digits",
        });
    }
    Ok(())
}

/// Thin typed wrapper over [`ApiClient`] for the account endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, identity: &str, password: &str) -> Result<TokenPair, ApiError> {
        self.client.login(identity, password).await
    }

    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.client.send_json(ApiRequest::get(ME_PATH)).await
    }

    /// Creates the account, then signs in with the same credentials and
    /// stores the issued tokens.
    ///
    /// A failed sign-in after the account was created is reported as
    /// [`ApiError::RegisteredButSignInFailed`] so callers do not offer to
    /// register again.
    pub async fn register(&self, registration: &Registration) -> Result<TokenPair, ApiError> {
        registration.validate()?;
        let request = ApiRequest::post(REGISTER_PATH)
            .anonymous()
            .json(registration)?;
        self.client.send_empty(request).await?;

        let pair = self
            .client
            .login(&registration.email, &registration.password)
            .await
            .map_err(|err| ApiError::RegisteredButSignInFailed(Box::new(err)))?;
        session::store_credentials(self.client.store().as_ref(), &pair)?;
        Ok(pair)
    }

    /// Confirms the emailed code and stores the issued tokens.
    pub async fn verify_email_code(&self, email: &str, code: &str) -> Result<TokenPair, ApiError> {
        validate_email(email)?;
        let code = code.trim();
        validate_code(code)?;

        let request = ApiRequest::post(VERIFY_PATH).anonymous().json(&EmailCode {
            email: email.trim(),
            code,
        })?;
        let pair: TokenPair = self.client.send_json(request).await?;
        session::store_credentials(self.client.store().as_ref(), &pair)?;
        Ok(pair)
    }

    pub async fn resend_email_code(&self, email: &str) -> Result<(), ApiError> {
        validate_email(email)?;
        let request = ApiRequest::post(RESEND_PATH)
            .anonymous()
            .json(&EmailOnly {
                email: email.trim(),
            })?;
        self.client.send_empty(request).await
    }

    /// Always succeeds for well-formed emails so accounts cannot be probed.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        validate_email(email)?;
        let request = ApiRequest::post(PASSWORD_FORGOT_PATH)
            .anonymous()
            .json(&EmailOnly {
                email: email.trim(),
            })?;
        self.client.send_empty(request).await
    }

    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        validate_email(email)?;
        let code = code.trim();
        validate_code(code)?;
        validate_password(new_password)?;

        let request = ApiRequest::post(PASSWORD_RESET_PATH)
            .anonymous()
            .json(&PasswordReset {
                email: email.trim(),
                code,
                new_password,
            })?;
        self.client.send_empty(request).await
    }

    /// Drops both tokens. The backend keeps no server-side session to end.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.client.store().clear()?;
        Ok(())
    }
}
