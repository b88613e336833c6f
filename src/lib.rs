//! Tally feed is the engine behind an infinitely scrolling list of personal
//! finance transactions.
//!
//! This library loads cursor-paged transactions from a [TransactionService],
//! groups them into local calendar days with income, expense and net totals,
//! tracks multi-row selection (ctrl/meta toggle, shift range and whole days) and
//! deletes transactions optimistically, rolling the list back if the service
//! rejects the delete.
//!
//! A [SqliteTransactionService] is included for local databases and tests.

#![warn(missing_docs)]

mod config;
mod database_id;
mod error;
mod feed;
mod logging;
mod money;
mod selection;
mod service;
mod timezone;
mod transaction;
mod view;

#[cfg(test)]
mod test_utils;

pub use config::FeedConfig;
pub use database_id::{AccountId, CategoryId, DatabaseId, TransactionId};
pub use error::Error;
pub use feed::{
    Bounds, CacheSnapshot, DependentQuery, FeedController, FeedView, Invalidations, LoadOutcome,
    LoadRequests, LoadSource, LoadTrigger, MutationCoordinator, PageCache, ScrollMetrics,
    ScrollPoller, SessionId, TransactionList, TransactionQuery, TriggerSource, ViewportSentinel,
    run_load_requests,
};
pub use logging::{DEFAULT_LOG_FILTER, setup_logging};
pub use money::{Amount, DEFAULT_CURRENCY_CODE, NANOS_PER_UNIT, format_currency};
pub use selection::{Modifiers, SelectionMode, SelectionState};
pub use service::{Cursor, ListRequest, Page, SqliteTransactionService, TransactionService};
pub use timezone::LocalZone;
pub use transaction::{
    Calendar, DayGroup, Direction, DirectionDisplay, FieldStatus, MISSING_TIME, SelectionSummary,
    Timestamp, Transaction, TransactionBuilder, TransactionUpdate, categorization_status, day_key,
    group_by_day, merchant_status,
};
pub use view::{MutationStatus, selection_summary_card, transaction_list_view};
