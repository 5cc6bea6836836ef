//! Error types for the fanbus client
//!
//! Data-plane operations (codec, property map, envelope construction) fail
//! synchronously with a [`BusError`] at the call site. Session faults travel
//! asynchronously as [`crate::envelope::Event`] items through the event
//! receiver path instead, so there is one uniform notification channel for
//! connection state.

use thiserror::Error;

/// Main error type for fanbus operations
#[derive(Debug, Error, PartialEq)]
pub enum BusError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Property not found: {key}")]
    NotFound { key: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl BusError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a lookup-miss error for a property key
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

/// Error returned by receiver pulls once the feeding dispatcher is closed
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    #[error("receiver closed")]
    Closed,
}

/// Error returned by non-blocking receiver pulls
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    #[error("queue empty")]
    Empty,
    #[error("receiver closed")]
    Closed,
}

/// Result type for fanbus operations
pub type BusResult<T> = Result<T, BusError>;
