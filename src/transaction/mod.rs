//! Transaction models and the pure functions derived from them.
//!
//! This module contains:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Calendar and status helpers for displaying transactions
//! - Grouping of transactions into day buckets with totals
//! - Totals for arbitrary selections of transactions

mod analytics;
mod core;
mod format;
mod grouping;

#[cfg(test)]
pub(crate) mod test_utils;

pub use analytics::SelectionSummary;
pub use core::{Direction, Timestamp, Transaction, TransactionBuilder, TransactionUpdate};
pub use format::{
    Calendar, DirectionDisplay, FieldStatus, MISSING_TIME, categorization_status, day_key,
    merchant_status,
};
pub use grouping::{DayGroup, group_by_day};
