//! Test utilities and helpers
//!
//! Scripted poll sources and feed configurations shared by the feed tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use marketfeed_feedcontrol::{FeedConfiguration, FeedEvent, FeedEvents, PollSource};
use marketfeed_marketplace::{
    AccessParameters, AccessResponse, MarketplaceError, OfferingId,
};

/// What a scripted poll returns
#[derive(Debug, Clone)]
pub enum Outcome {
    Body(String),
    HttpError(u16),
}

/// Poll source that replays a script and records when it was polled
pub struct ScriptedSource {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    latency: Duration,
    polls: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    /// Always answers with a two-element JSON array
    pub fn healthy() -> Arc<Self> {
        Self::with_script(Vec::new(), Outcome::Body(r#"[{"id": 1}, {"id": 2}]"#.to_string()))
    }

    /// Always answers with HTTP 503
    pub fn failing() -> Arc<Self> {
        Self::with_script(Vec::new(), Outcome::HttpError(503))
    }

    /// Replays `script`, then keeps answering with `fallback`
    pub fn with_script(script: Vec<Outcome>, fallback: Outcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            latency: Duration::ZERO,
            polls: Mutex::new(Vec::new()),
        })
    }

    /// Healthy source whose polls take `latency` to answer
    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Outcome::Body("[]".to_string()),
            latency,
            polls: Mutex::new(Vec::new()),
        })
    }

    pub fn poll_count(&self) -> usize {
        self.polls.lock().len()
    }

    pub fn poll_times(&self) -> Vec<Instant> {
        self.polls.lock().clone()
    }
}

#[async_trait]
impl PollSource for ScriptedSource {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    async fn poll(&self, _params: &AccessParameters) -> marketfeed_marketplace::Result<AccessResponse> {
        self.polls.lock().push(Instant::now());
        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match outcome {
            Outcome::Body(body) => Ok(AccessResponse::new(OfferingId::new("scripted"), body)),
            Outcome::HttpError(status) => Err(MarketplaceError::http(status, "scripted")),
        }
    }
}

/// Feed configuration with whole-second interval and lifetime
pub fn feed_config(interval_secs: u64, lifetime_secs: u64) -> FeedConfiguration {
    FeedConfiguration::new(
        AccessParameters::from_entries([("radius", 777)]),
        Duration::from_secs(interval_secs),
        Duration::from_secs(lifetime_secs),
    )
}

/// Take every event that is already queued
pub fn drain_queued(events: &mut FeedEvents) -> Vec<FeedEvent> {
    let mut drained = Vec::new();
    while let Some(event) = events.try_next_event() {
        drained.push(event);
    }
    drained
}

/// Receive events until the stream ends
pub async fn collect_until_end(events: &mut FeedEvents) -> Vec<FeedEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

/// Elapsed time between consecutive instants
pub fn gaps(times: &[Instant]) -> Vec<Duration> {
    times.windows(2).map(|w| w[1] - w[0]).collect()
}
