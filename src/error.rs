//! Error types for a3s-access

use crate::observer::ObserverFailure;
use thiserror::Error;

/// Errors that can occur while deciding or dispatching access events
#[derive(Debug, Error)]
pub enum AccessError {
    /// Candidate identity is unset (empty principal name)
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// An observer returned an error or panicked during `update`
    #[error("Observer '{observer}' failed: {reason}")]
    ObserverFailed {
        observer: String,
        reason: String,
    },

    /// A sink could not accept a record
    #[error("Sink '{sink}' rejected record: {reason}")]
    Sink {
        sink: String,
        reason: String,
    },

    /// Underlying I/O failure (file sinks)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for access operations
pub type Result<T> = std::result::Result<T, AccessError>;

impl From<ObserverFailure> for AccessError {
    fn from(failure: ObserverFailure) -> Self {
        Self::ObserverFailed {
            observer: failure.observer,
            reason: format!(
                "{:?} at position {}: {}",
                failure.kind, failure.position, failure.message
            ),
        }
    }
}
