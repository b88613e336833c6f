//! Producers that ask the feed for more transactions as the user nears the end.
//!
//! Two independent producers exist: a sentinel placed after the last row that
//! fires when it comes near the viewport, and a throttled check of the remaining
//! scroll distance for layouts where the sentinel is unreliable. Both send into
//! one single-slot queue, so a burst of requests from either collapses into one
//! guarded load.

use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::service::TransactionService;

use super::{FeedController, LoadOutcome, LoadSource};

/// The vertical extent of an element or of the viewport, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// The top edge.
    pub top: f64,
    /// The bottom edge.
    pub bottom: f64,
}

impl Bounds {
    /// Bounds spanning `top..bottom`.
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }
}

/// Watches the load-more sentinel against the viewport grown by a margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSentinel {
    margin_px: f64,
}

impl ViewportSentinel {
    /// Fire `margin_px` before the sentinel actually scrolls into view.
    pub fn new(margin_px: f64) -> Self {
        Self { margin_px }
    }

    /// Whether `sentinel` intersects `viewport` expanded by the margin.
    pub fn is_triggered(&self, sentinel: Bounds, viewport: Bounds) -> bool {
        sentinel.top <= viewport.bottom + self.margin_px
            && sentinel.bottom >= viewport.top - self.margin_px
    }
}

/// The scroll position of the list's scroll container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// How far the container is scrolled from the top.
    pub scroll_top: f64,
    /// The total height of the scrollable content.
    pub scroll_height: f64,
    /// The visible height of the container.
    pub client_height: f64,
}

impl ScrollMetrics {
    /// The distance left to scroll before the end of the content.
    pub fn remaining(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }
}

/// Checks the remaining scroll distance at most once per throttle period.
#[derive(Debug, Clone)]
pub struct ScrollPoller {
    threshold_px: f64,
    throttle: Duration,
    last_check: Option<Instant>,
}

impl ScrollPoller {
    /// Fire when less than `threshold_px` is left to scroll, checking at most once per `throttle`.
    pub fn new(threshold_px: f64, throttle: Duration) -> Self {
        Self {
            threshold_px,
            throttle,
            last_check: None,
        }
    }

    /// Handle a scroll event at `now`.
    ///
    /// The first event of a throttle period is checked, the rest are ignored.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> bool {
        if self
            .last_check
            .is_some_and(|last| now.saturating_duration_since(last) < self.throttle)
        {
            return false;
        }

        self.last_check = Some(now);
        metrics.remaining() < self.threshold_px
    }
}

/// Which producer asked for a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// The load-more sentinel came near the viewport.
    Sentinel,
    /// The scroll poller found little content left.
    Scroll,
}

/// The sending half of the load request queue.
#[derive(Debug, Clone)]
pub struct LoadTrigger {
    sender: mpsc::Sender<TriggerSource>,
}

/// The receiving half of the load request queue, see [run_load_requests].
#[derive(Debug)]
pub struct LoadRequests {
    receiver: mpsc::Receiver<TriggerSource>,
}

impl LoadTrigger {
    /// Create a queue that holds at most one pending request.
    pub fn channel() -> (LoadTrigger, LoadRequests) {
        let (sender, receiver) = mpsc::channel(1);

        (LoadTrigger { sender }, LoadRequests { receiver })
    }

    /// Ask for the next page. Returns false if a request is already pending.
    pub fn request(&self, source: TriggerSource) -> bool {
        match self.sender.try_send(source) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Dropping {source:?} load request, one is already queued");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Dropping {source:?} load request, nothing is consuming requests");
                false
            }
        }
    }
}

/// Load a page for every queued request until all [LoadTrigger]s are dropped.
pub async fn run_load_requests<S: TransactionService>(
    feed: FeedController<S>,
    mut requests: LoadRequests,
) {
    while let Some(source) = requests.receiver.recv().await {
        match feed.load(LoadSource::Trigger).await {
            Ok(LoadOutcome::Loaded) => tracing::debug!("{source:?} loaded a page"),
            Ok(outcome) => tracing::debug!("{source:?} load request ignored: {outcome:?}"),
            Err(error) => tracing::warn!("{source:?} load request failed: {error}"),
        }
    }

    tracing::debug!("All load triggers dropped, stopping");
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, Instant},
    };

    use crate::{
        config::FeedConfig,
        feed::{FeedController, TransactionQuery},
        service::test_utils::{ScriptedService, page},
        transaction::test_utils::transactions,
    };

    use super::{
        Bounds, LoadTrigger, ScrollMetrics, ScrollPoller, TriggerSource, ViewportSentinel,
        run_load_requests,
    };

    #[test]
    fn sentinel_fires_within_margin() {
        let sentinel = ViewportSentinel::new(400.0);
        let viewport = Bounds::new(0.0, 800.0);

        assert!(sentinel.is_triggered(Bounds::new(1_150.0, 1_151.0), viewport));
        assert!(sentinel.is_triggered(Bounds::new(500.0, 501.0), viewport));
        assert!(!sentinel.is_triggered(Bounds::new(1_250.0, 1_251.0), viewport));
        assert!(!sentinel.is_triggered(Bounds::new(-600.0, -599.0), viewport));
    }

    #[test]
    fn scroll_poller_fires_under_threshold() {
        let mut poller = ScrollPoller::new(800.0, Duration::from_millis(200));
        let start = Instant::now();
        let far = ScrollMetrics {
            scroll_top: 0.0,
            scroll_height: 5_000.0,
            client_height: 1_000.0,
        };
        let near = ScrollMetrics {
            scroll_top: 3_500.0,
            ..far
        };

        assert!(!poller.on_scroll(far, start));
        assert!(poller.on_scroll(near, start + Duration::from_millis(250)));
    }

    #[test]
    fn scroll_poller_ignores_events_inside_throttle_period() {
        let mut poller = ScrollPoller::new(800.0, Duration::from_millis(200));
        let start = Instant::now();
        let near = ScrollMetrics {
            scroll_top: 3_500.0,
            scroll_height: 5_000.0,
            client_height: 1_000.0,
        };

        assert!(poller.on_scroll(near, start));
        assert!(!poller.on_scroll(near, start + Duration::from_millis(100)));
        assert!(poller.on_scroll(near, start + Duration::from_millis(200)));
    }

    #[test]
    fn queue_holds_one_request() {
        let (trigger, _requests) = LoadTrigger::channel();

        assert!(trigger.request(TriggerSource::Sentinel));
        assert!(!trigger.request(TriggerSource::Scroll));
    }

    #[tokio::test]
    async fn sentinel_and_scroll_together_fetch_once() {
        let service = Arc::new(ScriptedService::new(vec![
            page(transactions(1, 5), Some("p1")),
            page(transactions(6, 5), None),
        ]));
        let feed = FeedController::new(
            Arc::clone(&service),
            TransactionQuery::default(),
            FeedConfig::default(),
        );
        let (trigger, requests) = LoadTrigger::channel();

        trigger.request(TriggerSource::Sentinel);
        trigger.request(TriggerSource::Scroll);
        drop(trigger);
        run_load_requests(feed.clone(), requests).await;

        assert_eq!(service.list_calls(), 1);
        assert_eq!(feed.items().len(), 5);
    }

    #[tokio::test]
    async fn triggered_loads_share_the_in_flight_guard() {
        let service = Arc::new(ScriptedService::gated(vec![page(transactions(1, 5), None)]));
        let feed = FeedController::new(
            Arc::clone(&service),
            TransactionQuery::default(),
            FeedConfig::default(),
        );
        let (trigger, requests) = LoadTrigger::channel();
        let consumer = tokio::spawn(run_load_requests(feed.clone(), requests));

        let (caller, ()) = tokio::join!(feed.load_more(), async {
            trigger.request(TriggerSource::Scroll);
            tokio::task::yield_now().await;
            service.release(2);
        });
        drop(trigger);
        consumer.await.unwrap();

        assert!(caller.is_ok());
        assert_eq!(service.list_calls(), 1);
        assert_eq!(feed.items().len(), 5);
    }
}
