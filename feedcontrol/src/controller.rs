//! Feed controller coordinating all continuous-access feeds
//!
//! Owns every feed instance; callers address them through [`FeedHandle`]s.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use marketfeed_marketplace::{AccessParameters, Offering};

use crate::config::FeedControllerConfig;
use crate::error::{FeedError, Result};
use crate::events::FeedEvents;
use crate::feed::{FeedConfiguration, FeedHandle, FeedMetrics};
use crate::scheduler::{run_feed, FeedShared};
use crate::source::PollSource;
use crate::FeedStatus;

/// Feeds shared by all clones of a controller
struct FeedRegistry {
    /// Registered feeds, including ended ones until removed
    feeds: DashMap<FeedHandle, Arc<FeedShared>>,

    /// Held across the capacity check and the insert of a new feed
    admission: Mutex<()>,
}

impl FeedRegistry {
    fn active_count(&self) -> usize {
        self.feeds
            .iter()
            .filter(|entry| entry.value().status().is_active())
            .count()
    }

    /// Stop every feed, returning how many were still active
    fn stop_all(&self) -> usize {
        // Collect first so no map shard stays locked while feeds stop
        let feeds: Vec<Arc<FeedShared>> = self.feeds.iter().map(|e| Arc::clone(e.value())).collect();
        feeds
            .iter()
            .filter(|feed| !feed.status().is_terminal())
            .filter(|feed| feed.stop() == FeedStatus::Stopped)
            .count()
    }
}

impl Drop for FeedRegistry {
    fn drop(&mut self) {
        let stopped = self.stop_all();
        if stopped > 0 {
            info!(stopped, "Feed controller dropped, remaining feeds stopped");
        }
    }
}

/// Manager for all continuous-access feeds. Cheap to clone; clones share
/// the same feeds. Dropping the last clone stops every feed still active.
#[derive(Clone)]
pub struct FeedController {
    registry: Arc<FeedRegistry>,

    /// Controller settings
    config: FeedControllerConfig,
}

impl FeedController {
    /// Create a new feed controller
    pub fn new(config: FeedControllerConfig) -> Self {
        Self {
            registry: Arc::new(FeedRegistry {
                feeds: DashMap::new(),
                admission: Mutex::new(()),
            }),
            config,
        }
    }

    pub fn config(&self) -> &FeedControllerConfig {
        &self.config
    }

    /// Start polling `source`. The first poll is scheduled immediately.
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        source: Arc<dyn PollSource>,
        configuration: FeedConfiguration,
    ) -> Result<(FeedHandle, FeedEvents)> {
        configuration.validate()?;

        let _admission = self.registry.admission.lock();
        let active = self.registry.active_count();
        if active >= self.config.max_active_feeds {
            warn!(active, max = self.config.max_active_feeds, "Feed limit reached");
            return Err(FeedError::CapacityExceeded {
                max: self.config.max_active_feeds,
            });
        }

        let handle = FeedHandle::new();
        let (sender, receiver) = mpsc::unbounded_channel();
        let interval = configuration.interval();
        let lifetime = configuration.lifetime();
        let shared = Arc::new(FeedShared::new(handle, source.name(), configuration, sender));
        let events = FeedEvents::new(handle, receiver, shared.stop_flag());

        self.registry.feeds.insert(handle, Arc::clone(&shared));
        let task = tokio::spawn(run_feed(Arc::clone(&shared), Arc::clone(&source)));
        shared.attach_task(task);

        info!(
            feed = %handle,
            source = %source.name(),
            interval_secs = interval.as_secs_f64(),
            lifetime_secs = lifetime.as_secs_f64(),
            "Feed started"
        );
        Ok((handle, events))
    }

    /// Start a feed on a subscribed offering with the default interval and
    /// failure policy
    pub fn access_continuous(
        &self,
        offering: &Offering,
        params: AccessParameters,
        lifetime: Duration,
    ) -> Result<(FeedHandle, FeedEvents)> {
        let configuration = FeedConfiguration::new(params, self.config.default_interval(), lifetime)
            .with_failure_policy(self.config.default_failure_policy);
        self.start(Arc::new(offering.clone()), configuration)
    }

    /// Stop a feed. Stopping an ended feed is a no-op returning the status
    /// it ended in.
    pub fn stop(&self, handle: FeedHandle) -> Result<FeedStatus> {
        Ok(self.feed(handle)?.stop())
    }

    /// Pause a running feed
    pub fn pause(&self, handle: FeedHandle) -> Result<()> {
        self.feed(handle)?.pause()
    }

    /// Resume a paused feed; the next poll happens one interval from now
    pub fn resume(&self, handle: FeedHandle) -> Result<()> {
        self.feed(handle)?.resume()
    }

    /// Set the total lifetime of a feed, counted from its start
    pub fn set_lifetime(&self, handle: FeedHandle, lifetime: Duration) -> Result<()> {
        self.feed(handle)?.set_lifetime(lifetime)
    }

    pub fn status(&self, handle: FeedHandle) -> Result<FeedStatus> {
        Ok(self.feed(handle)?.status())
    }

    pub fn metrics(&self, handle: FeedHandle) -> Result<FeedMetrics> {
        Ok(self.feed(handle)?.metrics())
    }

    /// Time left before the feed's lifetime elapses
    pub fn remaining_lifetime(&self, handle: FeedHandle) -> Result<Duration> {
        Ok(self.feed(handle)?.remaining_lifetime())
    }

    /// Forget an ended feed
    pub fn remove(&self, handle: FeedHandle) -> Result<()> {
        let feed = self.feed(handle)?;
        let status = feed.status();
        if !status.is_terminal() {
            return Err(FeedError::invalid_transition(handle, status, "remove"));
        }
        self.registry.feeds.remove(&handle);
        Ok(())
    }

    /// Handles of all registered feeds
    pub fn handles(&self) -> Vec<FeedHandle> {
        let mut handles: Vec<FeedHandle> = self.registry.feeds.iter().map(|entry| *entry.key()).collect();
        handles.sort();
        handles
    }

    /// Number of feeds that are running or paused
    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Stop every feed
    pub fn stop_all(&self) {
        let stopped = self.registry.stop_all();
        info!(stopped, "All feeds stopped");
    }

    fn feed(&self, handle: FeedHandle) -> Result<Arc<FeedShared>> {
        self.registry
            .feeds
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(FeedError::UnknownFeed(handle))
    }
}

impl Default for FeedController {
    fn default() -> Self {
        Self::new(FeedControllerConfig::default())
    }
}
