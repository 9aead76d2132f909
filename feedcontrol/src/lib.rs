//! # Marketfeed Feed Control
//!
//! Continuous access to marketplace offerings. A [`FeedController`] polls an
//! offering at a fixed interval for a bounded lifetime and hands every result
//! to the caller through a [`FeedEvents`] stream. Feeds can be paused,
//! resumed, given a new lifetime and stopped while they run.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod feed;
mod scheduler;
pub mod source;

pub use config::FeedControllerConfig;
pub use controller::FeedController;
pub use error::{FeedError, Result};
pub use events::FeedEvents;
pub use feed::{FailurePolicy, FeedConfiguration, FeedEvent, FeedHandle, FeedMetrics};
pub use source::PollSource;

/// Current version of the feed controller
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lifecycle status of a feed
///
/// `Running` and `Paused` alternate under caller control; `Stopped`,
/// `Expired` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Running,
    Paused,
    Stopped,
    Expired,
    Failed,
}

impl FeedStatus {
    /// Get the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            FeedStatus::Running => "running",
            FeedStatus::Paused => "paused",
            FeedStatus::Stopped => "stopped",
            FeedStatus::Expired => "expired",
            FeedStatus::Failed => "failed",
        }
    }

    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, FeedStatus::Stopped | FeedStatus::Expired | FeedStatus::Failed)
    }

    /// Check if results may still be delivered
    pub fn is_active(&self) -> bool {
        matches!(self, FeedStatus::Running | FeedStatus::Paused)
    }
}

impl std::fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
