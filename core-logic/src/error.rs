//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for core-logic operations.
///
/// This enum wraps all specific error types and provides a unified
/// error interface for the application layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    /// An account reported a condition that must stop the whole process.
    #[error("Fatal error from account {account}: {message}")]
    Fatal { account: usize, message: String },
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid URL for '{field}': '{url}'")]
    InvalidUrl { field: String, url: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },

    #[error("The number of proxies and credentials must be equal (credentials: {credentials}, proxies: {proxies})")]
    CountMismatch { credentials: usize, proxies: usize },

    #[error("Unable to resolve API base URL: {reason}")]
    BaseUrlUnresolved { reason: String },
}

/// Bearer credential decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Malformed token: expected 3 dot-separated segments, got {segments}")]
    InvalidSegments { segments: usize },

    #[error("Token payload is not valid base64url: {reason}")]
    InvalidEncoding { reason: String },

    #[error("Token payload is not valid JSON: {reason}")]
    InvalidPayload { reason: String },

    #[error("Token payload is missing claim '{claim}'")]
    MissingClaim { claim: String },
}

/// Result of a single account task that did not complete normally.
///
/// The runner maps each variant to a different tier: `Skipped` and `Failed`
/// end only the current account, `Fatal` stops every account.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("skipped: {0}")]
    Skipped(String),

    #[error("failed: {0}")]
    Failed(String),

    #[error("fatal: {0}")]
    Fatal(String),
}
