//! The pages fetched for one paging session.

use std::collections::HashSet;

use crate::{
    database_id::TransactionId,
    service::{Cursor, Page},
    transaction::Transaction,
};

use super::SessionId;

/// The pages of the current session in fetch order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageCache {
    pages: Vec<Page>,
}

impl PageCache {
    /// The cached pages in fetch order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Append the next page.
    pub fn push(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Every cached transaction, pages concatenated in fetch order.
    pub fn items(&self) -> Vec<Transaction> {
        self.iter().cloned().collect()
    }

    /// Iterate over every cached transaction in fetch order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.pages.iter().flat_map(|page| page.transactions.iter())
    }

    /// The number of cached transactions.
    pub fn len(&self) -> usize {
        self.pages.iter().map(|page| page.transactions.len()).sum()
    }

    /// Whether no transactions are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether no page has been fetched yet.
    pub fn has_no_pages(&self) -> bool {
        self.pages.is_empty()
    }

    /// The cursor to request the next page with.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.pages.last().and_then(|page| page.next_cursor.as_ref())
    }

    /// Whether there may be another page. True until the first page arrives.
    pub fn has_more(&self) -> bool {
        self.pages
            .last()
            .is_none_or(|page| page.next_cursor.is_some())
    }

    /// Remove every transaction in `ids` from every page.
    ///
    /// Page boundaries, the remaining order and cursors are left as they were.
    /// Returns the number of transactions removed.
    pub fn remove_ids(&mut self, ids: &HashSet<TransactionId>) -> usize {
        let before = self.len();

        for page in &mut self.pages {
            page.transactions
                .retain(|transaction| !ids.contains(&transaction.id));
        }

        before - self.len()
    }

    /// Copy the cache so it can be put back with [PageCache::restore].
    pub fn snapshot(&self, session: SessionId) -> CacheSnapshot {
        CacheSnapshot {
            session,
            pages: self.pages.clone(),
        }
    }

    /// Replace the cache with a snapshot, verbatim.
    pub fn restore(&mut self, snapshot: CacheSnapshot) {
        self.pages = snapshot.pages;
    }
}

/// A copy of the page cache taken before an optimistic mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    /// The session the pages belong to.
    pub session: SessionId,
    /// The pages as they were.
    pub pages: Vec<Page>,
}
