//! Configuration management for the consumer application
//!
//! Loaded from layered files and environment, or from a single YAML file
//! given on the command line.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use marketfeed_feedcontrol::FeedControllerConfig;
use marketfeed_marketplace::{
    AccessParameters, AccessValue, ConsumerConfig, Information, LicenseType, OfferingQuery, Price,
    PricingModel, ProxyConfig,
};

use crate::error::{Result, ScenarioError};
use crate::scenario::ScenarioTimings;

/// Consumer application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerAppConfig {
    /// Marketplace identity and connectivity
    pub consumer: ConsumerConfig,

    /// Secret used to authenticate the consumer
    pub secret: String,

    /// Offering search settings
    pub query: QuerySettings,

    /// Area sent as access parameters
    pub area: AreaSettings,

    /// Feed controller settings
    pub feeds: FeedControllerConfig,

    /// Delays between scenario steps
    pub timings: ScenarioTimings,
}

/// Offering search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySettings {
    pub name: String,
    pub information_name: String,
    pub category: String,
    pub city: String,
    pub pricing_model: PricingModel,
    pub max_price_eur: f64,
    pub license: LicenseType,
}

impl QuerySettings {
    pub fn to_query(&self) -> OfferingQuery {
        OfferingQuery::new(
            self.name.clone(),
            Information::new(self.information_name.clone(), self.category.clone()),
        )
        .in_city(self.city.clone())
        .with_pricing_model(self.pricing_model)
        .with_max_price(Price::euros(self.max_price_eur))
        .with_license(self.license)
    }
}

/// Circular search area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSettings {
    pub latitude: f64,
    pub longitude: f64,

    /// Radius in meters
    pub radius: i64,
}

impl AreaSettings {
    /// Nested access parameters describing the area
    pub fn to_params(&self) -> AccessParameters {
        AccessParameters::from_entries([(
            "areaSpecification",
            AccessParameters::from_entries([
                (
                    "geoCoordinates",
                    AccessValue::from(AccessParameters::from_entries([
                        ("latitude", self.latitude),
                        ("longitude", self.longitude),
                    ])),
                ),
                ("radius", AccessValue::from(self.radius)),
            ]),
        )])
    }
}

impl Default for ConsumerAppConfig {
    fn default() -> Self {
        let mut consumer = ConsumerConfig::default();
        let mut proxy = ProxyConfig::new("194.145.60.1", 9400);
        proxy.bypass.push("172.17.17.100".to_string());
        consumer.proxy = Some(proxy);

        Self {
            consumer,
            secret: "-9DLobRfRx63EwL_OJYj-w==".to_string(),
            query: QuerySettings {
                name: "ParkingQuery".to_string(),
                information_name: "Parking Query".to_string(),
                category: "bigiot:Parking".to_string(),
                city: "Barcelona".to_string(),
                pricing_model: PricingModel::PerAccess,
                max_price_eur: 0.002,
                license: LicenseType::OpenDataLicense,
            },
            area: AreaSettings {
                latitude: 50.22,
                longitude: 8.11,
                radius: 777,
            },
            feeds: FeedControllerConfig::default(),
            timings: ScenarioTimings::default(),
        }
    }
}

impl ConsumerAppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with built-in defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Environment variables with MARKETFEED__ prefix
            .add_source(Environment::with_prefix("MARKETFEED").separator("__"))
            .build()?;

        let app: Self = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScenarioError::Config(ConfigError::Foreign(Box::new(e))))?;

        let app: Self = serde_yaml::from_str(&content)
            .map_err(|e| ScenarioError::Config(ConfigError::Foreign(Box::new(e))))?;

        app.validate()?;
        Ok(app)
    }

    /// Save configuration to YAML file (for generating examples)
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| ScenarioError::internal(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.consumer.validate()?;
        self.feeds.validate()?;

        if self.secret.is_empty() {
            return Err(ConfigError::Message("secret cannot be empty".into()));
        }

        if self.query.category.trim().is_empty() {
            return Err(ConfigError::Message("query.category cannot be empty".into()));
        }

        if self.query.max_price_eur < 0.0 {
            return Err(ConfigError::Message("query.max_price_eur cannot be negative".into()));
        }

        if self.area.radius <= 0 {
            return Err(ConfigError::Message("area.radius must be greater than 0".into()));
        }

        self.timings.validate()
    }
}
