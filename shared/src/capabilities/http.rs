use crux_http::http::headers::AUTHORIZATION;
use crux_http::RequestBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::auth::Session;
use crate::config::DEFAULT_API_BASE_URL;

pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("invalid URL '{url}': {reason}")]
    Invalid { url: String, reason: String },
}

/// Base URL of the AidLink backend, checked once when configured.
///
/// Only `http`/`https` with a host and without credentials, query or
/// fragment. Private hosts are allowed: development runs against localhost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiBaseUrl {
    url: String,
}

impl ApiBaseUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, UrlError> {
        let raw = url.into();
        let trimmed = raw.trim();

        let invalid = |reason: &str| UrlError::Invalid {
            url: truncate_url(trimmed),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("URL cannot be empty"));
        }
        if trimmed.len() > MAX_URL_LENGTH {
            return Err(invalid("URL is too long"));
        }

        let parsed = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("only 'http' and 'https' are allowed"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("URL must have a host"));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(invalid("credentials in URL are not allowed"));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(invalid("base URL cannot carry a query or fragment"));
        }

        Ok(Self {
            url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn endpoint(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.url, endpoint.path())
    }
}

impl Default for ApiBaseUrl {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl TryFrom<String> for ApiBaseUrl {
    type Error = UrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiBaseUrl> for String {
    fn from(value: ApiBaseUrl) -> Self {
        value.url
    }
}

impl std::fmt::Display for ApiBaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

fn truncate_url(url: &str) -> String {
    const SHOWN: usize = 100;
    if url.chars().count() > SHOWN {
        let head: String = url.chars().take(SHOWN).collect();
        format!("{head}...")
    } else {
        url.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Chat,
    Camps,
    RecentCamps,
    AddCamp,
    Register,
    Login,
    VerifyOtp,
    VerifyEmail,
    Logout,
}

impl Endpoint {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Chat => "/chat",
            Self::Camps => "/camp",
            Self::RecentCamps => "/camp/recent",
            Self::AddCamp => "/camp/add",
            Self::Register => "/auth/register",
            Self::Login => "/auth/login",
            Self::VerifyOtp => "/auth/verify-otp",
            Self::VerifyEmail => "/auth/verify-email",
            Self::Logout => "/auth/logout",
        }
    }
}

/// Adds `Authorization: Bearer <token>` when the session has one.
pub fn with_bearer<Ev, B>(
    builder: RequestBuilder<Ev, B>,
    session: &Session,
) -> RequestBuilder<Ev, B>
where
    Ev: 'static,
    B: 'static,
{
    match session.authorization() {
        Some(value) => builder.header(AUTHORIZATION, value),
        None => builder,
    }
}
