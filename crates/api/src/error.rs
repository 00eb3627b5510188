use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error body the platform answers with: `{code, message, description}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformError {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl PlatformError {
    /// Decode a platform-shaped error body, if the text is one.
    pub fn from_body(text: &str) -> Option<Self> {
        let parsed: Self = serde_json::from_str(text).ok()?;
        if parsed.message.is_empty() && parsed.description.is_none() {
            return None;
        }
        Some(parsed)
    }
}

/// A failed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFailure {
    pub status: u16,
    pub method: String,
    pub url: String,
    /// Platform message, or the raw body when the body is not platform-shaped.
    pub message: String,
    pub payload: Option<PlatformError>,
}

impl HttpFailure {
    pub fn new(status: u16, method: &str, url: &str, body: &str) -> Self {
        let payload = PlatformError::from_body(body);
        let message = match &payload {
            Some(PlatformError { message, description, .. }) if message.is_empty() => {
                description.clone().unwrap_or_default()
            }
            Some(payload) => payload.message.clone(),
            None if body.trim().is_empty() => format!("HTTP {status}"),
            None => body.trim().to_string(),
        };
        Self {
            status,
            method: method.to_string(),
            url: url.to_string(),
            message,
            payload,
        }
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {} {})", self.message, self.status, self.method, self.url)
    }
}

/// Errors produced by the platform client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Auth(HttpFailure),

    #[error("{0}")]
    NotFound(HttpFailure),

    #[error("{0}")]
    Conflict(HttpFailure),

    #[error("{0}")]
    RateLimited(HttpFailure),

    #[error("{0}")]
    Server(HttpFailure),

    #[error("{0}")]
    Request(HttpFailure),

    #[error("authentication is not possible: {reason}")]
    AuthSetup { reason: String },

    #[error("{method} {url}: {reason}")]
    Transport { method: String, url: String, reason: String },

    #[error("task {task_id} did not finish within {waited_secs}s (last status {last_status})")]
    TaskTimeout {
        task_id: String,
        last_status: String,
        waited_secs: u64,
    },

    #[error("task {task_id} ended with status {status}: {message}")]
    TaskFailure {
        task_id: String,
        status: String,
        message: String,
    },

    #[error("{total} records exceed the limit of {cap}; add filters to narrow the query")]
    TooManyRecords { total: u64, cap: u64 },

    #[error("cannot decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("no endpoint configured for subsystem '{subsystem}'")]
    NoEndpoint { subsystem: String },
}

impl ApiError {
    /// Translate a non-success status into the matching variant.
    pub fn from_status(failure: HttpFailure) -> Self {
        match failure.status {
            401 | 403 => Self::Auth(failure),
            404 => Self::NotFound(failure),
            409 => Self::Conflict(failure),
            429 => Self::RateLimited(failure),
            500..=599 => Self::Server(failure),
            _ => Self::Request(failure),
        }
    }

    /// One-word category shown in diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Auth(_) | Self::AuthSetup { .. } => "AuthError",
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::RateLimited(_) => "RateLimited",
            Self::Server(_) => "ServerError",
            Self::Request(_) => "RequestError",
            Self::Transport { .. } => "TransportError",
            Self::TaskTimeout { .. } => "TaskTimeout",
            Self::TaskFailure { .. } => "TaskFailure",
            Self::TooManyRecords { .. } => "TooManyRecords",
            Self::Decode { .. } => "DecodeError",
            Self::NoEndpoint { .. } => "ConfigError",
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.failure().map(|failure| failure.status)
    }

    pub fn failure(&self) -> Option<&HttpFailure> {
        match self {
            Self::Auth(failure)
            | Self::NotFound(failure)
            | Self::Conflict(failure)
            | Self::RateLimited(failure)
            | Self::Server(failure)
            | Self::Request(failure) => Some(failure),
            _ => None,
        }
    }
}
