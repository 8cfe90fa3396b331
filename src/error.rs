// Error types for the hubfile client.
// Covers input validation, transport failures, and decoding of API payloads.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decoding error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("File content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HubError {
    /// Shorthand for an input validation failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        HubError::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
