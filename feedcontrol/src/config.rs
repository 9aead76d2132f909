//! Configuration management for the feed controller

use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::feed::FailurePolicy;

/// Settings shared by all feeds of a controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedControllerConfig {
    /// Polling interval used by `access_continuous`, in milliseconds
    pub default_interval_ms: u64,

    /// Failure policy used by `access_continuous`
    pub default_failure_policy: FailurePolicy,

    /// Maximum number of running or paused feeds
    pub max_active_feeds: usize,
}

impl FeedControllerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_interval_ms == 0 {
            return Err(ConfigError::Message("default_interval_ms must be greater than 0".into()));
        }

        if self.max_active_feeds == 0 {
            return Err(ConfigError::Message("max_active_feeds must be greater than 0".into()));
        }

        if self.default_failure_policy == FailurePolicy::StopAfterConsecutive(0) {
            return Err(ConfigError::Message(
                "default_failure_policy must allow at least one failure".into(),
            ));
        }

        Ok(())
    }

    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }
}

impl Default for FeedControllerConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: 10_000,
            default_failure_policy: FailurePolicy::KeepRunning,
            max_active_feeds: 64,
        }
    }
}
