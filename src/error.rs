// src/error.rs

use std::fmt;

use serde::Deserialize;

/// Global Client Error Enum.
/// Centralizes failure classification for every call the client makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    // Bad credentials, user-correctable by resubmitting the form
    AuthFailure(String),

    // Transport failure (connect, timeout, reset); never retried automatically
    NetworkFailure(String),

    // Client-side precondition not met; never reaches the network
    ValidationFailure(String),

    // Non-2xx response on an otherwise valid request
    ServerRejection { status: u16, message: String },

    // 2xx response whose body did not match the expected shape
    MalformedResponse(String),

    // Durable storage read/write failed
    Storage(String),

    // Missing or invalid configuration value
    Config(String),
}

impl ClientError {
    /// Whether a user can reasonably retry the same action later without changing input.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::NetworkFailure(_) | ClientError::Storage(_) => true,
            ClientError::ServerRejection { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::AuthFailure(msg) => write!(f, "authentication failed: {}", msg),
            ClientError::NetworkFailure(msg) => write!(f, "network failure: {}", msg),
            ClientError::ValidationFailure(msg) => write!(f, "validation failed: {}", msg),
            ClientError::ServerRejection { status, message } => {
                write!(f, "server rejected request ({}): {}", status, message)
            }
            ClientError::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
            ClientError::Storage(msg) => write!(f, "storage error: {}", msg),
            ClientError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

/// Error body shapes the backend is known to send.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    /// Extracts a human-readable message from a raw response body.
    /// Falls back to the raw text (or the status reason) when it is not JSON.
    pub(crate) fn message_from(raw: &str, fallback: &str) -> String {
        match serde_json::from_str::<ErrorBody>(raw) {
            Ok(body) => body
                .error
                .or(body.message)
                .unwrap_or_else(|| fallback.to_string()),
            Err(_) if !raw.trim().is_empty() => raw.trim().to_string(),
            Err(_) => fallback.to_string(),
        }
    }
}

/// Converts `reqwest::Error` into a `ClientError`.
/// Body decode errors mean the server answered with an unexpected shape.
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::MalformedResponse(err.to_string())
        } else {
            ClientError::NetworkFailure(err.to_string())
        }
    }
}

/// Converts `sqlx::Error` into `ClientError::Storage`.
/// Allows using `?` operator on storage queries.
impl From<sqlx::Error> for ClientError {
    fn from(err: sqlx::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for ClientError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::MalformedResponse(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(err: validator::ValidationErrors) -> Self {
        ClientError::ValidationFailure(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(err.to_string())
    }
}
