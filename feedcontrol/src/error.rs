//! Error types for feed control

use thiserror::Error;

use crate::feed::FeedHandle;
use crate::FeedStatus;

/// Result type alias for feed control operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors reported synchronously by the feed controller
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Invalid feed configuration: {message}")]
    Configuration { message: String },

    #[error("Unknown feed: {0}")]
    UnknownFeed(FeedHandle),

    #[error("Cannot {operation} feed {handle} while {status}")]
    InvalidTransition {
        handle: FeedHandle,
        status: FeedStatus,
        operation: &'static str,
    },

    #[error("Lifetime of feed {0} has elapsed")]
    LifetimeElapsed(FeedHandle),

    #[error("Feed limit reached: {max} active feeds")]
    CapacityExceeded { max: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FeedError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(handle: FeedHandle, status: FeedStatus, operation: &'static str) -> Self {
        Self::InvalidTransition {
            handle,
            status,
            operation,
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::CapacityExceeded { .. } => true,
            _ => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            FeedError::Configuration { .. } => "validation",
            FeedError::UnknownFeed(_) => "lookup",
            FeedError::InvalidTransition { .. } => "lifecycle",
            FeedError::LifetimeElapsed(_) => "lifecycle",
            FeedError::CapacityExceeded { .. } => "capacity",
            FeedError::Internal(_) => "internal",
        }
    }
}
