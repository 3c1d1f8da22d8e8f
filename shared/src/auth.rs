use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

use crate::error::{AppError, ErrorKind};
use crate::form::FormErrors;

const PASSWORD_SPECIALS: &str = "@$!%*?&";
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("already signed in as user {0}; sign out first")]
    AlreadySignedIn(UserId),
    #[error("login response carried an empty access token")]
    EmptyToken,
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::new(ErrorKind::InvalidState, e.to_string())
    }
}

#[derive(Debug)]
struct SignedIn {
    user_id: UserId,
    token: SecretString,
}

/// The signed-in user and their bearer token.
///
/// Written once per login and cleared on logout. Everything else only reads it.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<SignedIn>,
}

impl Session {
    pub fn sign_in(&mut self, user_id: UserId, token: SecretString) -> Result<(), SessionError> {
        if let Some(current) = &self.current {
            return Err(SessionError::AlreadySignedIn(current.user_id));
        }
        if token.expose_secret().trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }
        self.current = Some(SignedIn { user_id, token });
        info!(%user_id, "session started");
        Ok(())
    }

    /// Clears the session, returning who was signed in.
    pub fn sign_out(&mut self) -> Option<UserId> {
        let user_id = self.current.take().map(|s| s.user_id);
        if let Some(user_id) = user_id {
            info!(%user_id, "session cleared");
        }
        user_id
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.current.as_ref().map(|s| s.user_id)
    }

    #[must_use]
    pub fn bearer(&self) -> Option<&SecretString> {
        self.current.as_ref().map(|s| &s.token)
    }

    /// Value for the `Authorization` header, when signed in.
    #[must_use]
    pub fn authorization(&self) -> Option<String> {
        self.bearer()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }
}

fn serialize_secret<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern is a valid regex"))
}

fn check_email(email: &str, errors: &mut FormErrors) {
    if email.trim().is_empty() {
        errors.set("email", "Email is required");
    } else if !email_pattern().is_match(email) {
        errors.set("email", "Please enter valid email");
    }
}

/// At least 8 characters from letters, digits and `@$!%*?&`, with one of each class.
#[must_use]
pub fn is_strong_password(password: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c);

    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().all(allowed)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    LocalBody,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub role: Option<Role>,
    #[serde(rename = "checkbox")]
    pub accepted_terms: bool,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    #[serde(serialize_with = "serialize_secret")]
    pub confirm_password: SecretString,
    pub role: Role,
    pub checkbox: bool,
}

impl RegisterForm {
    #[must_use]
    pub fn errors(&self) -> FormErrors {
        let mut errors = FormErrors::new();

        if self.full_name.trim().is_empty() {
            errors.set("fullName", "Full name is required");
        }

        check_email(&self.email, &mut errors);

        let password = self.password.expose_secret();
        if password.is_empty() {
            errors.set("password", "Password is required");
        } else if !is_strong_password(password) {
            errors.set(
                "password",
                "Password must be 8+ chars, include uppercase, lowercase, number, and special character",
            );
        }

        let confirm = self.confirm_password.expose_secret();
        if confirm.is_empty() {
            errors.set("confirmPassword", "Confirm your password.");
        } else if confirm != password {
            errors.set("confirmPassword", "Passwords do not match.");
        }

        if self.role.is_none() {
            errors.set("role", "Please select a role");
        }

        if !self.accepted_terms {
            errors.set("checkbox", "Please agree to the terms and privacy policy");
        }

        errors
    }

    pub fn validate(&self) -> Result<RegisterRequest, FormErrors> {
        let errors = self.errors();
        let Some(role) = self.role else {
            return Err(errors);
        };
        errors.into_result(RegisterRequest {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
            role,
            checkbox: self.accepted_terms,
        })
    }
}

/// Registration hands back a token used to verify the OTP sent by email.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, FormErrors> {
        let mut errors = FormErrors::new();
        check_email(&self.email, &mut errors);
        if self.password.expose_secret().is_empty() {
            errors.set("password", "Password is required");
        }
        errors.into_result(LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: SecretString,
    #[serde(default)]
    pub message: String,
    pub id: UserId,
}

/// Body of `POST /auth/verify-otp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpForm {
    pub token: String,
    pub email: String,
    pub otp: String,
}

impl OtpForm {
    pub fn validate(&self) -> Result<OtpForm, FormErrors> {
        let mut errors = FormErrors::new();
        if self.token.trim().is_empty() {
            errors.set("token", "Verification session expired. Please register again");
        }
        check_email(&self.email, &mut errors);
        let otp = self.otp.trim();
        if otp.is_empty() {
            errors.set("otp", "OTP is required");
        } else if !otp.chars().all(|c| c.is_ascii_digit()) {
            errors.set("otp", "OTP must contain only digits");
        }
        errors.into_result(OtpForm {
            token: self.token.trim().to_string(),
            email: self.email.trim().to_string(),
            otp: otp.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpResponse {
    pub reset_token: SecretString,
}

/// Body of the email verification link call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyEmailResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /auth/logout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub user_id: UserId,
}
