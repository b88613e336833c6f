//! Totals for an arbitrary set of transactions, shown alongside the current selection.

use serde::Serialize;

use crate::money::nanos_to_display;

use super::core::{Direction, Transaction};

/// Income, expense and net totals for a set of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SelectionSummary {
    /// The sum of incoming amounts.
    pub total_income: f64,
    /// The sum of outgoing amounts as a positive number.
    pub total_expenses: f64,
    /// `total_income - total_expenses`.
    pub net: f64,
    /// The number of transactions summarised.
    pub count: usize,
    /// The net amount divided by the number of transactions.
    pub average_per_transaction: f64,
    /// Income as a percentage of all money moved.
    pub income_percentage: f64,
    /// Expenses as a percentage of all money moved.
    pub expense_percentage: f64,
}

impl SelectionSummary {
    /// Summarise `transactions`.
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut income_nanos = 0i128;
        let mut expense_nanos = 0i128;
        let mut count = 0;

        for transaction in transactions {
            match transaction.direction {
                Direction::Incoming => income_nanos += transaction.amount.total_nanos(),
                Direction::Outgoing => expense_nanos += transaction.amount.total_nanos(),
            }
            count += 1;
        }

        let total_income = nanos_to_display(income_nanos);
        let total_expenses = nanos_to_display(expense_nanos);
        let net = total_income - total_expenses;
        let total_flow = total_income + total_expenses;

        Self {
            total_income,
            total_expenses,
            net,
            count,
            average_per_transaction: if count > 0 { net / count as f64 } else { 0.0 },
            income_percentage: percent_of(total_income, total_flow),
            expense_percentage: percent_of(total_expenses, total_flow),
        }
    }
}

fn percent_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value / total * 100.0
    } else {
        0.0
    }
}
