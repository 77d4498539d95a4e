//! Error types for Tollgate.
//!
//! Only configuration and tier parsing can fail. The admission path itself
//! is infallible: a denial is a normal [`RateLimitResult`](crate::ratelimit::RateLimitResult),
//! not an error.

use thiserror::Error;

/// Main error type for Tollgate operations.
#[derive(Error, Debug)]
pub enum TollgateError {
    /// Configuration failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration sources could not be read or deserialized
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// A tier name did not match any known tier
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tollgate operations.
pub type Result<T> = std::result::Result<T, TollgateError>;
