//! Grouping logic for transactions (day groups and their totals).

use std::collections::BTreeMap;

use serde::Serialize;
use time::Date;

use crate::money::nanos_to_display;

use super::{
    core::{Direction, Transaction},
    format::{Calendar, day_key},
};

/// The transactions that happened on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGroup<'a> {
    /// The local calendar date.
    pub date: Date,
    /// The ISO date used as the bucket key, e.g. "2024-01-05".
    pub date_key: String,
    /// The human label, e.g. "yesterday".
    pub display_label: String,
    /// The day's transactions in the order they were received.
    pub transactions: Vec<&'a Transaction>,
    /// The currency of the day's first transaction, used to format the totals.
    pub currency_code: Option<String>,
    /// The sum of incoming amounts.
    pub total_incoming: f64,
    /// The sum of outgoing amounts, stored as a positive number.
    pub total_outgoing: f64,
    /// `total_incoming - total_outgoing`.
    pub net: f64,
}

#[derive(Default)]
struct DayTotals<'a> {
    transactions: Vec<&'a Transaction>,
    incoming_nanos: i128,
    outgoing_nanos: i128,
}

/// Group `transactions` into local calendar days, newest day first.
///
/// Transactions without a usable timestamp are left out of every group.
/// Days are ordered by date regardless of the order of `transactions`.
pub fn group_by_day<'a>(transactions: &'a [Transaction], calendar: &Calendar) -> Vec<DayGroup<'a>> {
    let mut days: BTreeMap<Date, DayTotals<'a>> = BTreeMap::new();

    for transaction in transactions {
        let Some(date) = transaction
            .occurred_at
            .as_ref()
            .and_then(|timestamp| calendar.local_date(timestamp))
        else {
            tracing::debug!(
                "Leaving transaction {} out of day groups, it has no usable date",
                transaction.id
            );
            continue;
        };

        let day = days.entry(date).or_default();
        match transaction.direction {
            Direction::Incoming => day.incoming_nanos += transaction.amount.total_nanos(),
            Direction::Outgoing => day.outgoing_nanos += transaction.amount.total_nanos(),
        }
        day.transactions.push(transaction);
    }

    let mut groups: Vec<DayGroup<'a>> = days
        .into_iter()
        .map(|(date, day)| {
            let total_incoming = nanos_to_display(day.incoming_nanos);
            let total_outgoing = nanos_to_display(day.outgoing_nanos);

            DayGroup {
                date,
                date_key: day_key(date),
                display_label: calendar.day_label(date),
                currency_code: day
                    .transactions
                    .first()
                    .map(|transaction| transaction.amount.currency_code.clone()),
                transactions: day.transactions,
                total_incoming,
                total_outgoing,
                net: total_incoming - total_outgoing,
            }
        })
        .collect();

    groups.sort_by(|a, b| b.date_key.cmp(&a.date_key));
    groups
}
