//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout docstack.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `NotInitialized`: Connection requested before the component was initialized
//! - `ConnectionNotFound`: Requested name is not present in the configuration
//! - `InvalidHost`: Resolved host is missing, not a string, or blank
//! - `DriverConnection`: The document driver failed to establish a connection
//! - `DriverDisconnect`: The document driver failed during bulk teardown
//! - `ConfigError`: Configuration sub-tree, options or config file could not be read

use thiserror::Error;

/// Boxed driver error, propagated verbatim
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for docstack operations
#[derive(Error, Debug)]
pub enum DocstackError {
    /// `get_connection` was called before `init`
    #[error("component not initialized")]
    NotInitialized,

    /// Requested connection name is absent from the resolved configuration
    #[error("connection not found")]
    ConnectionNotFound { name: String },

    /// Resolved host is missing, not a string, or blank after trimming
    #[error("host must be non-empty string")]
    InvalidHost { name: String },

    /// Driver failed to establish a connection (network, auth, topology)
    #[error(transparent)]
    DriverConnection(BoxError),

    /// Driver failed during bulk disconnect
    #[error(transparent)]
    DriverDisconnect(BoxError),

    /// Configuration error (unreadable sub-tree, bad options, invalid file)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DocstackError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::ConnectionNotFound { .. } => "CONNECTION_NOT_FOUND",
            Self::InvalidHost { .. } => "INVALID_HOST",
            Self::DriverConnection(_) => "DRIVER_CONNECTION",
            Self::DriverDisconnect(_) => "DRIVER_DISCONNECT",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Get human-readable error message
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a connection-not-found error
    pub fn connection_not_found(name: impl Into<String>) -> Self {
        Self::ConnectionNotFound { name: name.into() }
    }

    /// Create an invalid-host error
    pub fn invalid_host(name: impl Into<String>) -> Self {
        Self::InvalidHost { name: name.into() }
    }

    /// Wrap a driver connect failure
    pub fn driver_connection(err: impl Into<BoxError>) -> Self {
        Self::DriverConnection(err.into())
    }

    /// Wrap a driver disconnect failure
    pub fn driver_disconnect(err: impl Into<BoxError>) -> Self {
        Self::DriverDisconnect(err.into())
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

/// Result type alias for docstack operations
pub type Result<T> = std::result::Result<T, DocstackError>;
