//! Feed configuration, handles, events and metrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use marketfeed_marketplace::{AccessParameters, AccessResponse, MarketplaceError};

use crate::error::{FeedError, Result};

/// Caller-side identifier of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedHandle(Uuid);

impl FeedHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the controller does when polls keep failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report every failure and keep polling
    KeepRunning,

    /// Move the feed to `Failed` after this many consecutive failures
    StopAfterConsecutive(u32),
}

impl FailurePolicy {
    /// Whether `consecutive_failures` ends the feed under this policy
    pub fn gives_up_after(&self, consecutive_failures: u32) -> bool {
        match self {
            FailurePolicy::KeepRunning => false,
            FailurePolicy::StopAfterConsecutive(limit) => consecutive_failures >= *limit,
        }
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::KeepRunning
    }
}

/// Parameters of one continuous-access feed. Fixed once the feed starts;
/// only the lifetime can be changed afterwards, through the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfiguration {
    params: AccessParameters,
    interval: Duration,
    lifetime: Duration,
    failure_policy: FailurePolicy,
}

impl FeedConfiguration {
    pub fn new(params: AccessParameters, interval: Duration, lifetime: Duration) -> Self {
        Self {
            params,
            interval,
            lifetime,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn params(&self) -> &AccessParameters {
        &self.params
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Reject configurations that could never poll
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(FeedError::configuration("polling interval must be greater than 0"));
        }
        if self.lifetime.is_zero() {
            return Err(FeedError::configuration("lifetime must be greater than 0"));
        }
        if self.failure_policy == FailurePolicy::StopAfterConsecutive(0) {
            return Err(FeedError::configuration(
                "failure policy must allow at least one failure",
            ));
        }
        Ok(())
    }
}

/// Outcome of one poll, delivered to the feed's consumer
#[derive(Debug)]
pub enum FeedEvent {
    Success {
        handle: FeedHandle,
        response: AccessResponse,
        received_at: DateTime<Utc>,
    },
    Failure {
        handle: FeedHandle,
        error: MarketplaceError,
        consecutive_failures: u32,
        occurred_at: DateTime<Utc>,
    },
}

impl FeedEvent {
    pub fn handle(&self) -> FeedHandle {
        match self {
            FeedEvent::Success { handle, .. } | FeedEvent::Failure { handle, .. } => *handle,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FeedEvent::Success { .. })
    }
}

/// Per-feed poll counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedMetrics {
    /// Polls started
    pub polls_attempted: u64,

    /// Polls delivered as successes
    pub successes: u64,

    /// Polls delivered as failures
    pub failures: u64,

    /// Failures since the last success
    pub consecutive_failures: u32,

    /// Time the last poll started
    pub last_poll_at: Option<DateTime<Utc>>,

    /// Message of the last failure
    pub last_error: Option<String>,
}

impl FeedMetrics {
    pub(crate) fn record_attempt(&mut self) {
        self.polls_attempted += 1;
        self.last_poll_at = Some(Utc::now());
    }

    pub(crate) fn record_success(&mut self) {
        self.successes += 1;
        self.consecutive_failures = 0;
    }

    pub(crate) fn record_failure(&mut self, error: &MarketplaceError) {
        self.failures += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
    }

    /// Share of delivered polls that succeeded (1.0 before any delivery)
    pub fn success_rate(&self) -> f64 {
        let delivered = self.successes + self.failures;
        if delivered == 0 {
            1.0
        } else {
            self.successes as f64 / delivered as f64
        }
    }
}
