// src/error.rs

//! Unified error handling for the directory service.

use std::fmt;

use thiserror::Error;

/// Result type alias for directory operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Requested document does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// External data provider failed or was unreachable
    #[error("Upstream fetch failed{}: {message}", status_suffix(.status))]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Input record rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Document store answered with an unexpected status or payload
    #[error("Store error (status {status}): {message}")]
    Store { status: u16, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Create a not-found error for a resource kind and id.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create an upstream error carrying the provider's status code.
    pub fn upstream(status: u16, message: impl fmt::Display) -> Self {
        Self::Upstream {
            status: Some(status),
            message: message.to_string(),
        }
    }

    /// Create an upstream error for a provider that could not be reached.
    pub fn upstream_unreachable(message: impl fmt::Display) -> Self {
        Self::Upstream {
            status: None,
            message: message.to_string(),
        }
    }

    /// Create a store protocol error.
    pub fn store(status: u16, message: impl fmt::Display) -> Self {
        Self::Store {
            status,
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP-equivalent status for surfacing this error to an API layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 422,
            Self::Upstream { .. } => 502,
            _ => 500,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_embeds_status() {
        let err = AppError::upstream(503, "Service Unavailable");
        assert_eq!(
            err.to_string(),
            "Upstream fetch failed (status 503): Service Unavailable"
        );
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_unreachable_upstream_has_no_status() {
        let err = AppError::upstream_unreachable("connection refused");
        assert_eq!(err.to_string(), "Upstream fetch failed: connection refused");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::not_found("Item", "abc").status_code(), 404);
        assert_eq!(AppError::validation("bad").status_code(), 422);
        assert_eq!(AppError::store(400, "boom").status_code(), 500);
        assert!(AppError::not_found("Item", "abc").is_not_found());
    }
}
