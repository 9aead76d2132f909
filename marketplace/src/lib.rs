//! # Marketfeed Marketplace
//!
//! Client-side surface of an IoT data marketplace: building offering queries,
//! subscribing to offerings, one-time access and session management. The
//! marketplace itself is reached through the [`Marketplace`] and
//! [`OfferingAccess`] traits; [`InMemoryMarketplace`] backs the demo and tests.

pub mod config;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod offering;
pub mod types;

// Re-export commonly used types
pub use config::{ConsumerConfig, ProxyConfig};
pub use consumer::Consumer;
pub use error::{MarketplaceError, Result};
pub use memory::{InMemoryMarketplace, Responder};
pub use offering::{Marketplace, Offering, OfferingAccess};
pub use types::*;

/// Current version of the marketplace client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How an offering charges its consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    Free,
    PerAccess,
    PerMonth,
    PerByte,
}

impl PricingModel {
    /// Get the wire name of the pricing model
    pub fn name(&self) -> &'static str {
        match self {
            PricingModel::Free => "free",
            PricingModel::PerAccess => "per_access",
            PricingModel::PerMonth => "per_month",
            PricingModel::PerByte => "per_byte",
        }
    }
}

impl std::fmt::Display for PricingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PricingModel {
    type Err = MarketplaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "free" => Ok(PricingModel::Free),
            "per_access" => Ok(PricingModel::PerAccess),
            "per_month" => Ok(PricingModel::PerMonth),
            "per_byte" => Ok(PricingModel::PerByte),
            _ => Err(MarketplaceError::InvalidPricingModel(s.to_string())),
        }
    }
}

/// License attached to the data delivered by an offering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseType {
    OpenDataLicense,
    CreativeCommons,
    NonCommercialDataLicense,
}

impl LicenseType {
    /// Get the wire name of the license
    pub fn name(&self) -> &'static str {
        match self {
            LicenseType::OpenDataLicense => "open_data_license",
            LicenseType::CreativeCommons => "creative_commons",
            LicenseType::NonCommercialDataLicense => "non_commercial_data_license",
        }
    }

    /// Rank licenses from most to least permissive (lower is more permissive)
    pub fn permissiveness_rank(&self) -> u8 {
        match self {
            LicenseType::OpenDataLicense => 0,
            LicenseType::CreativeCommons => 1,
            LicenseType::NonCommercialDataLicense => 2,
        }
    }
}

impl std::fmt::Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for LicenseType {
    type Err = MarketplaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "open_data_license" | "open_data" => Ok(LicenseType::OpenDataLicense),
            "creative_commons" | "cc" => Ok(LicenseType::CreativeCommons),
            "non_commercial_data_license" | "non_commercial" => {
                Ok(LicenseType::NonCommercialDataLicense)
            }
            _ => Err(MarketplaceError::InvalidLicense(s.to_string())),
        }
    }
}
