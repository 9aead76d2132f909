//! End-to-end consumer scenario
//!
//! Authenticates, selects a parking offering, reads it once and then drives
//! a continuous feed on it through pause, resume, lifetime extension and
//! stop before leaving the marketplace.

use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use marketfeed_feedcontrol::{FeedController, FeedHandle, FeedStatus};
use marketfeed_marketplace::{Consumer, ConsumerConfig, Marketplace, OfferingId};

use crate::config::ConsumerAppConfig;
use crate::error::{Result, ScenarioError};
use crate::selector::OfferingSelector;
use crate::types::{AlternativeParking, ParkingResult};

/// Delays between scenario steps, in milliseconds, and feed lifetimes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioTimings {
    /// Wait between the one-time access and the start of the feed
    pub before_feed_ms: u64,

    /// Feed runs this long before being paused
    pub before_pause_ms: u64,

    /// Feed stays paused this long
    pub paused_ms: u64,

    /// Wait between resume and the lifetime change
    pub before_extend_ms: u64,

    /// Wait between the lifetime change and stop
    pub before_stop_ms: u64,

    /// Initial lifetime of the feed
    pub feed_lifetime_secs: u64,

    /// Lifetime set while the feed runs
    pub extended_lifetime_secs: u64,
}

impl Default for ScenarioTimings {
    fn default() -> Self {
        Self {
            before_feed_ms: 5_000,
            before_pause_ms: 23_000,
            paused_ms: 10_000,
            before_extend_ms: 10_000,
            before_stop_ms: 10_000,
            feed_lifetime_secs: 3_600,
            extended_lifetime_secs: 5_000,
        }
    }
}

impl ScenarioTimings {
    /// Same steps with delays short enough for a demo run
    pub fn fast() -> Self {
        Self {
            before_feed_ms: 0,
            before_pause_ms: 230,
            paused_ms: 100,
            before_extend_ms: 100,
            before_stop_ms: 100,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.feed_lifetime_secs == 0 || self.extended_lifetime_secs == 0 {
            return Err(ConfigError::Message("feed lifetimes must be greater than 0".into()));
        }
        Ok(())
    }

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }
}

/// What a scenario run observed
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub offering: OfferingId,
    pub one_time_elements: usize,
    pub parking: Vec<ParkingResult>,
    pub alternative: Vec<AlternativeParking>,
    pub feed: FeedHandle,
    pub paused_status: FeedStatus,
    pub final_status: FeedStatus,
    pub feed_successes: usize,
    pub feed_failures: usize,
}

/// Run the consumer scenario against `marketplace`
pub async fn run_scenario(
    marketplace: Arc<dyn Marketplace>,
    config: &ConsumerAppConfig,
) -> Result<ScenarioReport> {
    let timings = &config.timings;

    let mut consumer = Consumer::new(
        ConsumerConfig {
            proxy: None,
            ..config.consumer.clone()
        },
        marketplace,
    );
    if let Some(proxy) = &config.consumer.proxy {
        consumer.set_proxy(proxy.host.as_str(), proxy.port);
        for host in &proxy.bypass {
            consumer.add_proxy_bypass(host.as_str());
        }
    }

    consumer.authenticate(&config.secret).await?;

    let query = config.query.to_query();
    let candidates = consumer.discover(&query).await?;
    for candidate in &candidates {
        info!("  {}", candidate.summary());
    }

    let selector = OfferingSelector::new(true, true, true);
    let description = match selector.select(&candidates) {
        Some(description) => description.clone(),
        None => {
            error!(
                query = %query.name,
                "Couldn't find any offering. It may not be registered or may have expired"
            );
            return Err(ScenarioError::no_offering(query.name));
        }
    };

    let offering = consumer.subscribe(&description).await?;
    let params = config.area.to_params();

    let response = offering.access_one_time(&params).await?;
    if response.contains_error_marker() {
        return Err(ScenarioError::ErrorResponse(response.body));
    }
    let one_time_elements = response.element_count()?;
    info!(elements = one_time_elements, "One-time offering access");

    let parking: Vec<ParkingResult> = response.map()?;
    let alternative: Vec<AlternativeParking> = response.map()?;
    info!(
        available = parking.iter().filter(|p| p.is_available()).count(),
        total = parking.len(),
        "Parking results mapped"
    );

    sleep(ScenarioTimings::millis(timings.before_feed_ms)).await;

    let controller = FeedController::new(config.feeds.clone());
    let (feed, events) = controller.access_continuous(
        &offering,
        params,
        Duration::from_secs(timings.feed_lifetime_secs),
    )?;

    let successes = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));
    let dispatcher = events.dispatch(
        {
            let successes = Arc::clone(&successes);
            move |handle, response| {
                successes.fetch_add(1, Ordering::Relaxed);
                match response.element_count() {
                    Ok(elements) => info!(feed = %handle, elements, "Incoming feed data"),
                    Err(e) => warn!(feed = %handle, error = %e, "Unreadable feed data"),
                }
            }
        },
        {
            let failures = Arc::clone(&failures);
            move |handle, error| {
                failures.fetch_add(1, Ordering::Relaxed);
                warn!(feed = %handle, error = %error, "Feed operation failed");
            }
        },
    );

    let steps = drive_feed(&controller, feed, timings).await;
    // Stopped on every path, a failed step included
    let final_status = controller.stop(feed)?;
    dispatcher
        .await
        .map_err(|e| ScenarioError::internal(format!("Feed dispatch task failed: {}", e)))?;
    let paused_status = steps?;

    consumer.unsubscribe(&offering).await?;
    consumer.terminate().await?;

    let report = ScenarioReport {
        offering: description.id,
        one_time_elements,
        parking,
        alternative,
        feed,
        paused_status,
        final_status,
        feed_successes: successes.load(Ordering::Relaxed),
        feed_failures: failures.load(Ordering::Relaxed),
    };
    info!(
        offering = %report.offering,
        feed_successes = report.feed_successes,
        feed_failures = report.feed_failures,
        final_status = %report.final_status,
        "Scenario finished"
    );
    Ok(report)
}

/// Pause, resume and extend a running feed, returning its status while paused
async fn drive_feed(
    controller: &FeedController,
    feed: FeedHandle,
    timings: &ScenarioTimings,
) -> Result<FeedStatus> {
    sleep(ScenarioTimings::millis(timings.before_pause_ms)).await;
    controller.pause(feed)?;

    let paused_status = controller.status(feed)?;
    info!(feed = %feed, status = %paused_status, "Feed status");

    sleep(ScenarioTimings::millis(timings.paused_ms)).await;
    controller.resume(feed)?;

    sleep(ScenarioTimings::millis(timings.before_extend_ms)).await;
    controller.set_lifetime(feed, Duration::from_secs(timings.extended_lifetime_secs))?;

    sleep(ScenarioTimings::millis(timings.before_stop_ms)).await;
    Ok(paused_status)
}
