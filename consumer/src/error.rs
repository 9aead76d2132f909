//! Error types for the consumer application

use thiserror::Error;

use marketfeed_feedcontrol::FeedError;
use marketfeed_marketplace::MarketplaceError;

/// Result type alias for consumer operations
pub type Result<T> = std::result::Result<T, ScenarioError>;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("No offering found for query {query}")]
    NoOffering { query: String },

    #[error("Offering answered with an error: {0}")]
    ErrorResponse(String),

    #[error("Marketplace error: {0}")]
    Marketplace(#[from] MarketplaceError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScenarioError {
    pub fn no_offering<S: Into<String>>(query: S) -> Self {
        Self::NoOffering {
            query: query.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Check if the scenario could succeed when run again
    pub fn is_retryable(&self) -> bool {
        match self {
            ScenarioError::NoOffering { .. } => true,
            ScenarioError::Marketplace(e) => e.is_retryable(),
            ScenarioError::Feed(e) => e.is_retryable(),
            ScenarioError::Io(_) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ScenarioError::NoOffering { .. } => "discovery",
            ScenarioError::ErrorResponse(_) => "access",
            ScenarioError::Marketplace(e) => e.category(),
            ScenarioError::Feed(e) => e.category(),
            ScenarioError::Config(_) => "config",
            ScenarioError::Io(_) => "io",
            ScenarioError::Internal(_) => "internal",
        }
    }
}
