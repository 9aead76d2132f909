//! Delivery of feed events to the caller

use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use marketfeed_marketplace::{AccessResponse, MarketplaceError};

use crate::feed::{FeedEvent, FeedHandle};

/// Stream of events of one feed. Ends once the feed reaches a terminal status.
///
/// Once the feed is stopped, events still queued are discarded.
#[derive(Debug)]
pub struct FeedEvents {
    handle: FeedHandle,
    receiver: mpsc::UnboundedReceiver<FeedEvent>,
    stopped: Arc<AtomicBool>,
}

impl FeedEvents {
    pub(crate) fn new(
        handle: FeedHandle,
        receiver: mpsc::UnboundedReceiver<FeedEvent>,
        stopped: Arc<AtomicBool>,
    ) -> Self {
        Self {
            handle,
            receiver,
            stopped,
        }
    }

    pub fn handle(&self) -> FeedHandle {
        self.handle
    }

    /// Receive the next event, or `None` once the feed has ended
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.next().await
    }

    /// Take an event that is already queued without waiting
    pub fn try_next_event(&mut self) -> Option<FeedEvent> {
        if self.is_stopped() {
            return None;
        }
        let event = self.receiver.try_recv().ok()?;
        self.pass(event)
    }

    /// Drive a success/failure handler pair on a dedicated task until the
    /// feed ends. Handlers run one event at a time, never on the task that
    /// controls the feed.
    pub fn dispatch<S, F>(mut self, mut on_success: S, mut on_failure: F) -> JoinHandle<()>
    where
        S: FnMut(FeedHandle, AccessResponse) + Send + 'static,
        F: FnMut(FeedHandle, MarketplaceError) + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(event) = self.next().await {
                match event {
                    FeedEvent::Success {
                        handle, response, ..
                    } => on_success(handle, response),
                    FeedEvent::Failure { handle, error, .. } => on_failure(handle, error),
                }
            }
            debug!(feed = %self.handle, "Feed event dispatch finished");
        })
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn pass(&mut self, event: FeedEvent) -> Option<FeedEvent> {
        if self.is_stopped() {
            self.receiver.close();
            return None;
        }
        Some(event)
    }
}

impl Stream for FeedEvents {
    type Item = FeedEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_stopped() {
            return Poll::Ready(None);
        }
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(self.pass(event)),
            other => other,
        }
    }
}
