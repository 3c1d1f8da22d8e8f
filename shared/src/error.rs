use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    Server,
    Deserialization,
    Location,
    LocationPermissionDenied,
    FeatureUnavailable,
    InvalidState,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Server => "SERVER_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::FeatureUnavailable => "FEATURE_UNAVAILABLE",
            Self::InvalidState => "INVALID_STATE",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Server | Self::Location => {
                ErrorSeverity::Transient
            }
            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::Conflict
            | Self::Deserialization
            | Self::LocationPermissionDenied
            | Self::FeatureUnavailable
            | Self::InvalidState
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::Validation,
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 => Self::NotFound,
            408 => Self::Timeout,
            409 => Self::Conflict,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }
}

/// Failure reported by one of the remote collaborators (chat, camp directory, auth).
///
/// Mirrors the `{ message, status?, code? }` shape the backend and the HTTP
/// layer agree on, so it can be shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub code: Option<String>,
}

impl ApiError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match (self.status, self.code.as_deref()) {
            (Some(status), _) => ErrorKind::from_http_status(status),
            (None, Some("TIMEOUT")) => ErrorKind::Timeout,
            (None, Some("DESERIALIZATION_ERROR")) => ErrorKind::Deserialization,
            (None, Some("AUTH_ERROR")) => ErrorKind::Authentication,
            (None, Some("VALIDATION_ERROR")) => ErrorKind::Validation,
            (None, _) => ErrorKind::Network,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl From<crux_http::HttpError> for ApiError {
    fn from(e: crux_http::HttpError) -> Self {
        use crux_http::HttpError;

        match e {
            HttpError::Http {
                code,
                message,
                body,
            } => {
                let status = u16::from(code);
                let parsed = body
                    .as_deref()
                    .and_then(|b| serde_json::from_slice::<ApiErrorBody>(b).ok());
                let server_message = parsed
                    .as_ref()
                    .and_then(|p| p.message.clone().or_else(|| p.error.clone()));
                let server_code = parsed.and_then(|p| p.code);

                let mut error =
                    ApiError::new(server_message.unwrap_or(message)).with_status(status);
                error.code = server_code;
                error
            }
            HttpError::Json(reason) => {
                ApiError::new(format!("Unexpected response: {reason}"))
                    .with_code(ErrorKind::Deserialization.code())
            }
            HttpError::Url(reason) => ApiError::new(format!("Invalid request URL: {reason}"))
                .with_code(ErrorKind::Validation.code()),
            HttpError::Io(reason) => ApiError::new(reason).with_code(ErrorKind::Network.code()),
            HttpError::Timeout => {
                ApiError::new("Request timed out").with_code(ErrorKind::Timeout.code())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Authentication => "Please sign in to continue.".into(),
            ErrorKind::Authorization => {
                "You don't have permission to perform this action.".into()
            }
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::Server => "The server had a problem. Please try again later.".into(),
            ErrorKind::Deserialization => {
                "Received an unexpected response. Please try again later.".into()
            }
            ErrorKind::Location => {
                "Unable to determine your location. Showing the default area.".into()
            }
            ErrorKind::LocationPermissionDenied => {
                "Location access was denied. Showing the default area.".into()
            }
            ErrorKind::Validation
            | ErrorKind::Conflict
            | ErrorKind::FeatureUnavailable
            | ErrorKind::InvalidState => self.message.clone(),
            ErrorKind::Unknown => "An unexpected error occurred. Please try again.".into(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        let kind = e.kind();
        let mut error = AppError::new(kind, e.message.clone());
        if let Some(status) = e.status {
            error = error.with_context("http_status", status.to_string());
        }
        if let Some(code) = e.code {
            error = error.with_context("api_code", code);
        }
        error
    }
}

pub type AppResult<T> = Result<T, AppError>;
