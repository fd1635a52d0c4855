//! Error types for foliodb
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Store operations themselves almost never fail: read faults degrade to an
//! empty collection and write faults are logged by the flush sweep. Errors
//! surface from opening a store, parsing a filter, and configuration handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for foliodb operations
pub type FolioResult<T> = std::result::Result<T, FolioError>;

/// Error types for the foliodb store
#[derive(Debug, Error)]
pub enum FolioError {
    /// I/O error (file and directory operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The configured data root exists but is not a directory
    #[error("data root '{0}' exists but is not a directory")]
    NotADirectory(PathBuf),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A query filter could not be parsed
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Configuration file error
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

impl FolioError {
    /// Construct an `InvalidFilter` error from any message.
    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        FolioError::InvalidFilter(msg.into())
    }

    /// Construct an `InvalidConfig` error from any message.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        FolioError::InvalidConfig(msg.into())
    }

    /// Construct an `Internal` error from any message.
    pub fn internal(msg: impl Into<String>) -> Self {
        FolioError::Internal(msg.into())
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        FolioError::Serialization(e.to_string())
    }
}
