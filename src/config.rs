//! Tuning for the transaction feed.

use std::time::Duration;

/// The config for incremental loading of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// The number of transactions to request per page.
    pub page_size: u32,
    /// How far outside the viewport the load-more sentinel starts a load, in pixels.
    pub sentinel_margin_px: f64,
    /// The remaining scroll distance under which the scroll poller starts a load, in pixels.
    pub scroll_threshold_px: f64,
    /// The minimum time between two scroll position checks.
    pub scroll_throttle: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            sentinel_margin_px: 400.0,
            scroll_threshold_px: 800.0,
            scroll_throttle: Duration::from_millis(200),
        }
    }
}

impl FeedConfig {
    /// Use `page_size` transactions per page. Zero is raised to one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}
