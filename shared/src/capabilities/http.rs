use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{AppError, ErrorKind};

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_QUERY_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
    scheme: String,
    host: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, HttpError> {
        let url = url.into();
        let parsed = Self::validate(&url)?;
        Self::from_parsed(&parsed, &url)
    }

    fn from_parsed(parsed: &Url, original: &str) -> Result<Self, HttpError> {
        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl {
                url: Self::truncate_url(original),
                reason: "URL must have a host".to_string(),
            })?
            .to_lowercase();

        Ok(Self {
            url: parsed.to_string(),
            scheme: parsed.scheme().to_lowercase(),
            host,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    fn validate(url: &str) -> Result<Url, HttpError> {
        if url.trim().is_empty() {
            return Err(HttpError::InvalidUrl {
                url: url.to_string(),
                reason: "URL cannot be empty".to_string(),
            });
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            });
        }

        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl {
            url: Self::truncate_url(url),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme().to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            });
        }

        let Some(host) = parsed.host_str().map(str::to_lowercase) else {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: "URL must have a host".to_string(),
            });
        };

        if Self::is_private_host(&host) {
            return Err(HttpError::PrivateNetworkBlocked {
                url: Self::truncate_url(url),
                host,
            });
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: "credentials in URL are not allowed".to_string(),
            });
        }

        Ok(parsed)
    }

    fn is_private_host(host: &str) -> bool {
        if matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]" | "0.0.0.0") {
            return true;
        }

        if host.ends_with(".local") || host.ends_with(".localhost") || host.ends_with(".internal") {
            return true;
        }

        if host.starts_with("10.") || host.starts_with("192.168.") || host.starts_with("169.254.") {
            return true;
        }

        host.strip_prefix("172.")
            .and_then(|rest| rest.split('.').next())
            .and_then(|octet| octet.parse::<u8>().ok())
            .is_some_and(|octet| (16..=31).contains(&octet))
    }

    fn truncate_url(url: &str) -> String {
        if url.len() <= 100 {
            url.to_string()
        } else {
            let mut end = 100;
            while !url.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &url[..end])
        }
    }
}

/// Builds the geocoding search URL for `query`, returning at most `count`
/// results.
pub fn geocoding_url(base: &str, query: &str, count: usize) -> Result<ValidatedUrl, HttpError> {
    let query = query.trim();
    if query.is_empty() || query.len() > MAX_QUERY_LENGTH {
        return Err(HttpError::InvalidRequest {
            reason: format!("search text must be 1..={MAX_QUERY_LENGTH} bytes"),
        });
    }

    let base = ValidatedUrl::new(base)?;
    let parsed = Url::parse_with_params(
        base.as_str(),
        &[
            ("name", query),
            ("count", &count.to_string()),
            ("language", "en"),
            ("format", "json"),
        ],
    )
    .map_err(|e| HttpError::InvalidUrl {
        url: base.as_str().to_string(),
        reason: e.to_string(),
    })?;

    ValidatedUrl::from_parsed(&parsed, base.as_str())
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("private network access blocked: {url} resolves to {host}")]
    PrivateNetworkBlocked { url: String, host: String },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("request failed: {message}")]
    Transport { message: String },

    #[error("HTTP error {status}")]
    HttpStatus { status: u16 },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl HttpError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status } => *status == 429 || *status >= 500,
            Self::InvalidUrl { .. }
            | Self::PrivateNetworkBlocked { .. }
            | Self::InvalidRequest { .. }
            | Self::InvalidResponse { .. } => false,
        }
    }
}

impl From<crux_http::Error> for HttpError {
    fn from(e: crux_http::Error) -> Self {
        match e {
            crux_http::Error::Http(e) => Self::HttpStatus {
                status: e.code.into(),
            },
            crux_http::Error::Json(reason) => Self::InvalidResponse { reason },
            other @ (crux_http::Error::Url(_)
            | crux_http::Error::Io(_)
            | crux_http::Error::Timeout) => Self::Transport {
                message: other.to_string(),
            },
        }
    }
}

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        let kind = match &e {
            _ if e.is_retryable() => ErrorKind::Network,
            HttpError::InvalidResponse { .. } => ErrorKind::IncompleteData,
            _ => ErrorKind::Validation,
        };
        AppError::new(kind, "Location search failed").with_internal(e.to_string())
    }
}
