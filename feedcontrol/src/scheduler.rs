//! Per-feed scheduling
//!
//! Every feed runs one task that alternates between a scheduling decision
//! taken under the feed lock and, when due, a single poll. Control
//! operations change the shared state and wake the task; they never touch
//! a poll that is already running, except `stop`, which cancels it.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use marketfeed_marketplace::{AccessParameters, AccessResponse};

use crate::error::{FeedError, Result};
use crate::feed::{FailurePolicy, FeedConfiguration, FeedEvent, FeedHandle, FeedMetrics};
use crate::source::PollSource;
use crate::FeedStatus;

/// Stand-in for instants that overflow the clock
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// `from + after`, saturating to the far future instead of overflowing
fn instant_after(from: Instant, after: Duration) -> Instant {
    from.checked_add(after)
        .unwrap_or_else(|| from + FAR_FUTURE)
}

/// Mutable part of a feed, guarded by the feed lock
struct FeedState {
    status: FeedStatus,
    started_at: Instant,
    lifetime: Duration,
    next_poll_at: Instant,
    sender: Option<mpsc::UnboundedSender<FeedEvent>>,
    metrics: FeedMetrics,
}

impl FeedState {
    fn deadline(&self) -> Instant {
        instant_after(self.started_at, self.lifetime)
    }

    /// Enter a terminal status and close the event stream
    fn finish(&mut self, status: FeedStatus) {
        self.status = status;
        self.sender = None;
    }
}

enum Decision {
    Exit,
    Wait(Instant),
    Poll,
}

/// State shared between the controller and the feed's task
pub(crate) struct FeedShared {
    handle: FeedHandle,
    source_name: String,
    params: AccessParameters,
    interval: Duration,
    failure_policy: FailurePolicy,
    state: Mutex<FeedState>,
    wake: Notify,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    /// Raised by `stop`; the event stream discards whatever is still queued
    stopped: Arc<AtomicBool>,
}

impl FeedShared {
    pub(crate) fn new(
        handle: FeedHandle,
        source_name: String,
        configuration: FeedConfiguration,
        sender: mpsc::UnboundedSender<FeedEvent>,
    ) -> Self {
        let now = Instant::now();
        Self {
            handle,
            source_name,
            params: configuration.params().clone(),
            interval: configuration.interval(),
            failure_policy: configuration.failure_policy(),
            state: Mutex::new(FeedState {
                status: FeedStatus::Running,
                started_at: now,
                lifetime: configuration.lifetime(),
                next_poll_at: now,
                sender: Some(sender),
                metrics: FeedMetrics::default(),
            }),
            wake: Notify::new(),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag shared with the feed's event stream
    pub(crate) fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped)
    }

    pub(crate) fn status(&self) -> FeedStatus {
        self.state.lock().status
    }

    pub(crate) fn metrics(&self) -> FeedMetrics {
        self.state.lock().metrics.clone()
    }

    /// Time left before the lifetime elapses
    pub(crate) fn remaining_lifetime(&self) -> Duration {
        self.state
            .lock()
            .deadline()
            .saturating_duration_since(Instant::now())
    }

    pub(crate) fn attach_task(&self, task: JoinHandle<()>) {
        *self.task.lock() = Some(task);
    }

    pub(crate) fn pause(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.status != FeedStatus::Running {
            return Err(FeedError::invalid_transition(self.handle, state.status, "pause"));
        }
        state.status = FeedStatus::Paused;
        drop(state);

        self.wake.notify_one();
        info!(feed = %self.handle, "Feed paused");
        Ok(())
    }

    /// Resume a paused feed. The next poll is a full interval away.
    pub(crate) fn resume(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.status != FeedStatus::Paused {
            return Err(FeedError::invalid_transition(self.handle, state.status, "resume"));
        }

        let now = Instant::now();
        if now >= state.deadline() {
            state.finish(FeedStatus::Expired);
            drop(state);
            self.cancel.cancel();
            info!(feed = %self.handle, "Feed expired while paused");
            return Err(FeedError::LifetimeElapsed(self.handle));
        }

        state.status = FeedStatus::Running;
        state.next_poll_at = instant_after(now, self.interval);
        drop(state);

        self.wake.notify_one();
        info!(feed = %self.handle, "Feed resumed");
        Ok(())
    }

    /// Replace the lifetime, measured from the start of the feed. An already
    /// elapsed lifetime is picked up by the next scheduling decision.
    pub(crate) fn set_lifetime(&self, lifetime: Duration) -> Result<()> {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return Err(FeedError::invalid_transition(self.handle, state.status, "set lifetime of"));
        }
        state.lifetime = lifetime;
        drop(state);

        self.wake.notify_one();
        info!(feed = %self.handle, lifetime_secs = lifetime.as_secs_f64(), "Feed lifetime updated");
        Ok(())
    }

    /// Stop the feed, cancelling a scheduled or running poll. Returns the
    /// terminal status the feed ends up in.
    pub(crate) fn stop(&self) -> FeedStatus {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return state.status;
        }
        state.finish(FeedStatus::Stopped);
        self.stopped.store(true, Ordering::Release);
        drop(state);

        self.cancel.cancel();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        info!(feed = %self.handle, "Feed stopped");
        FeedStatus::Stopped
    }

    fn decide(&self, now: Instant) -> Decision {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return Decision::Exit;
        }

        let deadline = state.deadline();
        if now >= deadline {
            state.finish(FeedStatus::Expired);
            info!(
                feed = %self.handle,
                polls = state.metrics.polls_attempted,
                "Feed lifetime elapsed"
            );
            return Decision::Exit;
        }

        if state.status == FeedStatus::Paused {
            return Decision::Wait(deadline);
        }

        if now >= state.next_poll_at {
            state.next_poll_at = instant_after(now, self.interval);
            state.metrics.record_attempt();
            Decision::Poll
        } else {
            Decision::Wait(state.next_poll_at.min(deadline))
        }
    }

    fn deliver(&self, outcome: marketfeed_marketplace::Result<AccessResponse>) {
        let mut state = self.state.lock();
        if !state.status.is_active() {
            debug!(feed = %self.handle, status = %state.status, "Dropping result of ended feed");
            return;
        }

        let event = match outcome {
            Ok(response) => {
                state.metrics.record_success();
                debug!(feed = %self.handle, bytes = response.body.len(), "Feed poll succeeded");
                FeedEvent::Success {
                    handle: self.handle,
                    response,
                    received_at: Utc::now(),
                }
            }
            Err(error) => {
                state.metrics.record_failure(&error);
                let consecutive_failures = state.metrics.consecutive_failures;
                warn!(
                    feed = %self.handle,
                    source = %self.source_name,
                    consecutive_failures,
                    error = %error,
                    "Feed poll failed"
                );
                FeedEvent::Failure {
                    handle: self.handle,
                    error,
                    consecutive_failures,
                    occurred_at: Utc::now(),
                }
            }
        };

        let consecutive_failures = state.metrics.consecutive_failures;
        if let Some(sender) = &state.sender {
            if sender.send(event).is_err() {
                debug!(feed = %self.handle, "Feed events receiver dropped");
            }
        }

        if self.failure_policy.gives_up_after(consecutive_failures) {
            state.finish(FeedStatus::Failed);
            drop(state);
            self.cancel.cancel();
            warn!(feed = %self.handle, consecutive_failures, "Feed failed, giving up");
        }
    }

    async fn poll_once(&self, source: &dyn PollSource) -> Option<marketfeed_marketplace::Result<AccessResponse>> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            outcome = source.poll(&self.params) => Some(outcome),
        }
    }
}

/// Scheduling loop of one feed
pub(crate) async fn run_feed(shared: Arc<FeedShared>, source: Arc<dyn PollSource>) {
    debug!(feed = %shared.handle, source = %shared.source_name, "Feed task started");

    loop {
        match shared.decide(Instant::now()) {
            Decision::Exit => break,
            Decision::Wait(until) => {
                tokio::select! {
                    _ = shared.cancel.cancelled() => break,
                    _ = shared.wake.notified() => {}
                    _ = sleep_until(until) => {}
                }
            }
            Decision::Poll => match shared.poll_once(source.as_ref()).await {
                Some(outcome) => shared.deliver(outcome),
                None => break,
            },
        }
    }

    debug!(feed = %shared.handle, status = %shared.status(), "Feed task finished");
}
