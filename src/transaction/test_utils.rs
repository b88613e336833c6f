use time::{Duration, OffsetDateTime, macros::datetime};

use crate::{
    database_id::TransactionId,
    money::Amount,
    transaction::{Direction, Timestamp, Transaction},
};

/// A USD transaction of whole `units` at `occurred_at`.
pub fn transaction(
    id: TransactionId,
    occurred_at: OffsetDateTime,
    direction: Direction,
    units: u64,
) -> Transaction {
    Transaction {
        id,
        account_id: 1,
        occurred_at: Some(Timestamp::from(occurred_at)),
        direction,
        amount: Amount::new("USD", units, 0).expect("valid amount"),
        category_id: None,
        merchant: None,
        description: Some(format!("transaction {id}")),
        user_notes: None,
        category_manually_set: false,
        merchant_manually_set: false,
    }
}

/// `count` outgoing transactions with IDs starting at `first_id`, one hour
/// apart and newest first, starting from 2024-01-31 23:00 UTC.
pub fn transactions(first_id: TransactionId, count: usize) -> Vec<Transaction> {
    let newest = datetime!(2024-01-31 23:00 UTC);

    (0..count)
        .map(|offset| {
            let id = first_id + offset as TransactionId;
            let occurred_at = newest - Duration::hours(id - 1);
            transaction(id, occurred_at, Direction::Outgoing, 1 + offset as u64)
        })
        .collect()
}
