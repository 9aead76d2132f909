//! Marketfeed parking consumer
//!
//! Application layer on top of the marketplace client and the feed
//! controller. Looks up parking offerings in a city, picks one, reads it
//! once and then follows it through a continuous feed.
//!
//! ## Flow:
//! 1. **discover**: query the marketplace and select an offering
//! 2. **access**: one-time access mapped into [`ParkingResult`]s
//! 3. **follow**: continuous feed that is paused, resumed, extended and stopped

pub mod config;
pub mod error;
pub mod scenario;
pub mod seed;
pub mod selector;
pub mod types;

pub use config::{AreaSettings, ConsumerAppConfig, QuerySettings};
pub use error::{Result, ScenarioError};
pub use scenario::{run_scenario, ScenarioReport, ScenarioTimings};
pub use seed::demo_marketplace;
pub use selector::OfferingSelector;
pub use types::*;

/// Version of the consumer application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
