//! Defines the core data models for transactions.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    database_id::{AccountId, CategoryId, TransactionId},
    money::Amount,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money came into or went out of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money was received, e.g. a salary deposit.
    Incoming,
    /// Money was spent or transferred out.
    Outgoing,
}

impl Direction {
    /// The value used to store the direction as text.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }

    /// Parse the stored text form of a direction.
    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "incoming" => Some(Direction::Incoming),
            "outgoing" => Some(Direction::Outgoing),
            _ => None,
        }
    }
}

/// A point in time as seconds since the Unix epoch plus a sub-second remainder.
///
/// Every value is a real time, including the Unix epoch itself. Wire formats
/// that encode an unset timestamp as zero seconds, such as protobuf defaults,
/// must map it to `None` in [Transaction::occurred_at] before it gets here,
/// otherwise the transaction is bucketed on 1970-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since 1970-01-01 00:00 UTC.
    pub seconds: i64,
    /// The sub-second remainder in nanos.
    pub nanos: i32,
}

impl Timestamp {
    /// A timestamp for a whole number of seconds.
    pub fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Convert to a UTC date-time.
    ///
    /// Returns `None` if the timestamp is outside of the range `time` can represent.
    pub fn to_datetime(self) -> Option<OffsetDateTime> {
        let nanos = self.seconds as i128 * 1_000_000_000 + self.nanos as i128;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(value: OffsetDateTime) -> Self {
        Self {
            seconds: value.unix_timestamp(),
            nanos: value.nanosecond() as i32,
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Transactions are owned by the remote transaction service, the feed only
/// ever reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the transaction was made from or to.
    pub account_id: AccountId,
    /// When the transaction happened, missing if the source data had no usable date.
    pub occurred_at: Option<Timestamp>,
    /// Whether the money came in or went out.
    pub direction: Direction,
    /// How much money moved.
    pub amount: Amount,
    /// The ID of the category the transaction belongs to.
    pub category_id: Option<CategoryId>,
    /// The merchant the transaction was made with.
    pub merchant: Option<String>,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// Free-form notes added by the user.
    pub user_notes: Option<String>,
    /// Whether the category was chosen by the user rather than by a rule.
    pub category_manually_set: bool,
    /// Whether the merchant was entered by the user rather than detected.
    pub merchant_manually_set: bool,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        account_id: AccountId,
        occurred_at: Timestamp,
        direction: Direction,
        amount: Amount,
    ) -> TransactionBuilder {
        TransactionBuilder {
            account_id,
            occurred_at,
            direction,
            amount,
            category_id: None,
            merchant: None,
            description: None,
            user_notes: None,
        }
    }

    /// The merchant if there is one, otherwise the description.
    pub fn title(&self) -> &str {
        self.merchant
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("")
    }
}

/// A builder for new transactions, sent to the transaction service to create one.
///
/// # Examples
///
/// ```ignore
/// let builder = Transaction::build(
///         1,
///         Timestamp::from_seconds(1_704_412_800),
///         Direction::Outgoing,
///         Amount::new("NZD", 45, 990_000_000)?,
///     )
///     .merchant(Some("Coffee shop"))
///     .category_id(Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionBuilder {
    /// The account the transaction belongs to.
    pub account_id: AccountId,
    /// When the transaction happened.
    pub occurred_at: Timestamp,
    /// Whether the money came in or went out.
    pub direction: Direction,
    /// How much money moved.
    pub amount: Amount,
    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    pub category_id: Option<CategoryId>,
    /// The merchant the transaction was made with.
    pub merchant: Option<String>,
    /// A human-readable description of the transaction.
    pub description: Option<String>,
    /// Free-form notes.
    pub user_notes: Option<String>,
}

impl TransactionBuilder {
    /// Set the category ID for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the merchant for the transaction.
    pub fn merchant(mut self, merchant: Option<&str>) -> Self {
        self.merchant = merchant.map(str::to_owned);
        self
    }

    /// Set the description for the transaction.
    pub fn description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_owned);
        self
    }

    /// Set the user notes for the transaction.
    pub fn user_notes(mut self, user_notes: Option<&str>) -> Self {
        self.user_notes = user_notes.map(str::to_owned);
        self
    }
}

/// Changes to an existing transaction. Fields left as `None` are not changed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionUpdate {
    /// The transaction to update.
    pub id: TransactionId,
    /// A new account.
    pub account_id: Option<AccountId>,
    /// A new date.
    pub occurred_at: Option<Timestamp>,
    /// A new direction.
    pub direction: Option<Direction>,
    /// A new amount.
    pub amount: Option<Amount>,
    /// A new category, marks the category as manually set.
    pub category_id: Option<CategoryId>,
    /// A new merchant, marks the merchant as manually set.
    pub merchant: Option<String>,
    /// A new description.
    pub description: Option<String>,
    /// New notes.
    pub user_notes: Option<String>,
}

impl TransactionUpdate {
    /// An update for `id` that does not change anything yet.
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::money::Amount;

    use super::{Direction, Timestamp, Transaction};

    #[test]
    fn timestamp_round_trips_through_datetime() {
        let datetime = datetime!(2024-01-05 10:30:15.5 UTC);

        let timestamp = Timestamp::from(datetime);

        assert_eq!(timestamp.nanos, 500_000_000);
        assert_eq!(timestamp.to_datetime(), Some(datetime));
    }

    #[test]
    fn out_of_range_timestamp_has_no_datetime() {
        let timestamp = Timestamp::from_seconds(i64::MAX);

        assert_eq!(timestamp.to_datetime(), None);
    }

    #[test]
    fn epoch_zero_is_a_real_time() {
        let timestamp = Timestamp::from_seconds(0);

        assert_eq!(timestamp.to_datetime(), Some(time::OffsetDateTime::UNIX_EPOCH));
    }

    #[test]
    fn direction_text_round_trips() {
        for direction in [Direction::Incoming, Direction::Outgoing] {
            assert_eq!(Direction::from_str_opt(direction.as_str()), Some(direction));
        }
        assert_eq!(Direction::from_str_opt("sideways"), None);
    }

    #[test]
    fn builder_sets_optional_fields() {
        let builder = Transaction::build(
            1,
            Timestamp::from_seconds(0),
            Direction::Outgoing,
            Amount::new("NZD", 4, 500_000_000).unwrap(),
        )
        .merchant(Some("Bakery"))
        .category_id(Some(7));

        assert_eq!(builder.merchant.as_deref(), Some("Bakery"));
        assert_eq!(builder.category_id, Some(7));
        assert_eq!(builder.description, None);
    }
}
