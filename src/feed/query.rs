//! The filters that identify a paging session.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    database_id::{AccountId, CategoryId},
    money::Amount,
    transaction::Direction,
};

/// The filter parameters of a transaction list.
///
/// Two queries that compare equal share a paging session, any difference
/// starts a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TransactionQuery {
    /// Only show transactions for this account.
    pub account_id: Option<AccountId>,
    /// Free-text search over descriptions and merchants.
    pub search: Option<String>,
    /// Only show transactions at or after this time.
    pub start: Option<OffsetDateTime>,
    /// Only show transactions at or before this time.
    pub end: Option<OffsetDateTime>,
    /// Only show transactions of at least this amount.
    pub amount_min: Option<Amount>,
    /// Only show transactions of at most this amount.
    pub amount_max: Option<Amount>,
    /// Only show incoming or outgoing transactions.
    pub direction: Option<Direction>,
    /// Only show transactions in one of these categories. Empty means any category.
    pub categories: Vec<CategoryId>,
}

impl TransactionQuery {
    /// Restrict the query to one account.
    pub fn account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Search descriptions and merchants. Blank searches are ignored.
    pub fn search(mut self, search: &str) -> Self {
        let search = search.trim();
        self.search = (!search.is_empty()).then(|| search.to_owned());
        self
    }

    /// Only include transactions between `start` and `end` inclusive.
    pub fn between(mut self, start: Option<OffsetDateTime>, end: Option<OffsetDateTime>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Only include transactions with amounts in the given bounds.
    pub fn amounts(mut self, min: Option<Amount>, max: Option<Amount>) -> Self {
        self.amount_min = min;
        self.amount_max = max;
        self
    }

    /// Only include transactions in one direction.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Only include transactions in these categories.
    pub fn categories(mut self, categories: &[CategoryId]) -> Self {
        self.categories = categories.to_vec();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::TransactionQuery;

    #[test]
    fn blank_search_is_the_same_query_as_no_search() {
        assert_eq!(TransactionQuery::default().search("   "), TransactionQuery::default());
    }

    #[test]
    fn different_filters_are_different_queries() {
        let base = TransactionQuery::default().account(1);

        assert_ne!(base, base.clone().search("rent"));
        assert_ne!(base, TransactionQuery::default().account(2));
    }
}
