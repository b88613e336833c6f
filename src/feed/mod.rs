//! Incrementally loaded transaction lists.
//!
//! The [FeedController] fetches cursor-paged results for one
//! [TransactionQuery] at a time, the [MutationCoordinator] applies deletes to
//! its cache optimistically, and [TransactionList] ties both to a selection
//! and the load triggers of one list view.

mod cache;
mod controller;
mod list;
mod mutation;
mod query;
mod trigger;

pub use cache::{CacheSnapshot, PageCache};
pub use controller::{FeedController, FeedView, LoadOutcome, LoadSource, SessionId};
pub use list::TransactionList;
pub use mutation::{DependentQuery, Invalidations, MutationCoordinator};
pub use query::TransactionQuery;
pub use trigger::{
    Bounds, LoadRequests, LoadTrigger, ScrollMetrics, ScrollPoller, TriggerSource,
    ViewportSentinel, run_load_requests,
};
