//! Error types for the marketplace client

use thiserror::Error;

/// Result type alias for marketplace operations
pub type Result<T> = std::result::Result<T, MarketplaceError>;

/// Errors surfaced by the marketplace and by offering access
#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("Invalid pricing model: {0}")]
    InvalidPricingModel(String),

    #[error("Invalid license type: {0}")]
    InvalidLicense(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Consumer is not authenticated: {consumer}")]
    NotAuthenticated { consumer: String },

    #[error("Authentication rejected for consumer: {consumer}")]
    AuthenticationFailed { consumer: String },

    #[error("Incomplete offering query: {message}")]
    IncompleteOfferingQuery { message: String },

    #[error("Access to non-activated offering: {offering}")]
    AccessToNonActivatedOffering { offering: String },

    #[error("Access to non-subscribed offering: {offering}")]
    AccessToNonSubscribedOffering { offering: String },

    #[error("Unknown offering: {offering}")]
    UnknownOffering { offering: String },

    #[error("HTTP error {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    #[error("Response mapping failed: {message}")]
    Mapping { message: String },

    #[error("Session terminated")]
    SessionTerminated,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketplaceError {
    /// Create an incomplete query error
    pub fn incomplete_query<S: Into<String>>(message: S) -> Self {
        Self::IncompleteOfferingQuery {
            message: message.into(),
        }
    }

    /// Create a non-activated offering error
    pub fn not_activated<S: Into<String>>(offering: S) -> Self {
        Self::AccessToNonActivatedOffering {
            offering: offering.into(),
        }
    }

    /// Create a non-subscribed offering error
    pub fn not_subscribed<S: Into<String>>(offering: S) -> Self {
        Self::AccessToNonSubscribedOffering {
            offering: offering.into(),
        }
    }

    /// Create an HTTP error
    pub fn http<S: Into<String>>(status: u16, endpoint: S) -> Self {
        Self::Http {
            status,
            endpoint: endpoint.into(),
        }
    }

    /// Create a response mapping error
    pub fn mapping<S: Into<String>>(message: S) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            MarketplaceError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            MarketplaceError::InvalidPricingModel(_) => "validation",
            MarketplaceError::InvalidLicense(_) => "validation",
            MarketplaceError::Serialization(_) => "serialization",
            MarketplaceError::NotAuthenticated { .. } => "auth",
            MarketplaceError::AuthenticationFailed { .. } => "auth",
            MarketplaceError::IncompleteOfferingQuery { .. } => "query",
            MarketplaceError::AccessToNonActivatedOffering { .. } => "access",
            MarketplaceError::AccessToNonSubscribedOffering { .. } => "access",
            MarketplaceError::UnknownOffering { .. } => "access",
            MarketplaceError::Http { .. } => "http",
            MarketplaceError::Mapping { .. } => "mapping",
            MarketplaceError::SessionTerminated => "session",
            MarketplaceError::Internal(_) => "internal",
        }
    }
}
