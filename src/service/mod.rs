//! The contract the feed relies on from the remote transaction service.

mod sqlite;

#[cfg(test)]
pub(crate) mod test_utils;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::TransactionId,
    feed::TransactionQuery,
    transaction::{Transaction, TransactionBuilder, TransactionUpdate},
};

pub use sqlite::SqliteTransactionService;

/// An opaque position in a paged result set, issued by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a token, treating an empty token as no cursor.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.is_empty()).then_some(Self(token))
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A request for one page of transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    /// The filters for the list.
    pub query: TransactionQuery,
    /// Where to continue from, `None` for the first page.
    pub cursor: Option<Cursor>,
    /// The maximum number of transactions to return.
    pub limit: u32,
}

/// One page of transactions in server order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    /// The transactions on this page, newest first.
    pub transactions: Vec<Transaction>,
    /// The cursor for the next page, `None` on the last page.
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// A page, normalising an empty next cursor to `None`.
    pub fn new(transactions: Vec<Transaction>, next_cursor: Option<Cursor>) -> Self {
        let next_cursor = next_cursor.and_then(|cursor| Cursor::new(cursor.0));
        Self {
            transactions,
            next_cursor,
        }
    }
}

/// A remote store of transactions.
#[async_trait]
pub trait TransactionService: Send + Sync + 'static {
    /// Get the page of transactions after `request.cursor`.
    async fn list(&self, request: ListRequest) -> Result<Page, Error>;

    /// Delete all of `ids`. Succeeds or fails as a whole.
    async fn bulk_delete(&self, ids: &[TransactionId]) -> Result<(), Error>;

    /// Create a transaction.
    async fn create(&self, builder: TransactionBuilder) -> Result<Transaction, Error>;

    /// Change an existing transaction.
    async fn update(&self, update: TransactionUpdate) -> Result<Transaction, Error>;
}
