//! Optimistic deletes and the invalidation of aggregates that depend on the feed.

use std::sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

use tokio::sync::broadcast;

use crate::{
    Error,
    database_id::TransactionId,
    service::TransactionService,
    transaction::{Transaction, TransactionBuilder, TransactionUpdate},
};

use super::FeedController;

/// Views outside of the feed whose totals change when transactions change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependentQuery {
    /// The balance of each account.
    AccountBalances,
    /// Summaries and analytics computed from transactions.
    TransactionSummary,
}

impl DependentQuery {
    /// Every dependent query.
    pub const ALL: [DependentQuery; 2] = [
        DependentQuery::AccountBalances,
        DependentQuery::TransactionSummary,
    ];

    fn index(self) -> usize {
        match self {
            DependentQuery::AccountBalances => 0,
            DependentQuery::TransactionSummary => 1,
        }
    }
}

/// Tells dependent views that their data is out of date.
///
/// Views either subscribe to the broadcast or compare a generation they
/// remember against [Invalidations::generation].
#[derive(Debug, Clone)]
pub struct Invalidations {
    sender: broadcast::Sender<DependentQuery>,
    generations: Arc<[AtomicU64; 2]>,
}

impl Default for Invalidations {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(16);

        Self {
            sender,
            generations: Arc::new([AtomicU64::new(0), AtomicU64::new(0)]),
        }
    }
}

impl Invalidations {
    /// Receive every invalidation published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DependentQuery> {
        self.sender.subscribe()
    }

    /// The number of times `query` has been invalidated.
    pub fn generation(&self, query: DependentQuery) -> u64 {
        self.generations[query.index()].load(Ordering::SeqCst)
    }

    /// Mark `query` as out of date.
    pub fn invalidate(&self, query: DependentQuery) {
        self.generations[query.index()].fetch_add(1, Ordering::SeqCst);

        if self.sender.send(query).is_err() {
            tracing::debug!("No subscribers for {query:?} invalidation");
        }
    }

    /// Mark every dependent query as out of date.
    pub fn invalidate_dependents(&self) {
        for query in DependentQuery::ALL {
            self.invalidate(query);
        }
    }
}

/// Counts a service call as pending until dropped, so cancelled calls are not left pending.
struct PendingCall(Arc<AtomicUsize>);

impl PendingCall {
    fn start(pending: &Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(pending))
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Applies changes to transactions, deletes optimistically.
pub struct MutationCoordinator<S> {
    feed: FeedController<S>,
    invalidations: Invalidations,
    pending: Arc<AtomicUsize>,
}

impl<S> Clone for MutationCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            feed: self.feed.clone(),
            invalidations: self.invalidations.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<S: TransactionService> MutationCoordinator<S> {
    /// Create a coordinator that changes `feed`'s cache and publishes to `invalidations`.
    pub fn new(feed: FeedController<S>, invalidations: Invalidations) -> Self {
        Self {
            feed,
            invalidations,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The invalidations published after successful changes.
    pub fn invalidations(&self) -> &Invalidations {
        &self.invalidations
    }

    /// Whether a create, update or delete is waiting on the service.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Delete `ids`, removing them from the feed before the service confirms.
    ///
    /// If the service fails, the feed's pages are put back exactly as they were
    /// before the call. On success account balances and summaries are invalidated.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::MutationInFlight] if another delete has not finished yet,
    /// - or the service's error if the delete failed.
    pub async fn delete_many(&self, ids: &[TransactionId]) -> Result<(), Error> {
        if ids.is_empty() {
            return Ok(());
        }

        let snapshot = self.feed.begin_optimistic_delete(ids)?;
        let pending = PendingCall::start(&self.pending);
        let result = self.feed.service().bulk_delete(ids).await;
        drop(pending);

        match result {
            Ok(()) => {
                self.feed.finish_mutation();
                tracing::info!("Deleted {} transactions", ids.len());
                self.invalidations.invalidate_dependents();
                Ok(())
            }
            Err(error) => {
                tracing::error!("Could not delete {} transactions, rolling back: {error}", ids.len());
                self.feed.rollback(snapshot);
                Err(error)
            }
        }
    }

    /// Delete a single transaction. See [MutationCoordinator::delete_many].
    ///
    /// # Errors
    /// Same as [MutationCoordinator::delete_many].
    pub async fn delete_one(&self, id: TransactionId) -> Result<(), Error> {
        self.delete_many(&[id]).await
    }

    /// Create a transaction, then reload the feed from its first page.
    ///
    /// # Errors
    /// Returns the service's error if the create failed. A failed reload is
    /// kept in the feed's error instead.
    pub async fn create(&self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        let pending = PendingCall::start(&self.pending);
        let transaction = self.feed.service().create(builder).await;
        drop(pending);

        let transaction = transaction?;
        self.after_change().await;

        Ok(transaction)
    }

    /// Update a transaction, then reload the feed from its first page.
    ///
    /// # Errors
    /// Returns the service's error if the update failed.
    pub async fn update(&self, update: TransactionUpdate) -> Result<Transaction, Error> {
        let pending = PendingCall::start(&self.pending);
        let transaction = self.feed.service().update(update).await;
        drop(pending);

        let transaction = transaction?;
        self.after_change().await;

        Ok(transaction)
    }

    async fn after_change(&self) {
        self.invalidations.invalidate_dependents();

        if let Err(error) = self.feed.refetch().await {
            tracing::warn!("Could not reload the feed after a change: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use crate::{
        Error,
        config::FeedConfig,
        feed::{FeedController, TransactionQuery},
        money::Amount,
        service::test_utils::{ScriptedService, page},
        transaction::{Direction, Transaction, TransactionUpdate, test_utils::transactions},
    };

    use super::{DependentQuery, Invalidations, MutationCoordinator};

    async fn loaded(
        service: &Arc<ScriptedService>,
    ) -> (FeedController<ScriptedService>, MutationCoordinator<ScriptedService>) {
        let feed = FeedController::new(
            Arc::clone(service),
            TransactionQuery::default(),
            FeedConfig::default(),
        );
        feed.load_more().await.unwrap();
        feed.load_more().await.unwrap();
        let mutations = MutationCoordinator::new(feed.clone(), Invalidations::default());

        (feed, mutations)
    }

    fn two_pages() -> Vec<Result<crate::service::Page, Error>> {
        vec![
            page(transactions(1, 4), Some("p1")),
            page(transactions(5, 4), None),
        ]
    }

    #[tokio::test]
    async fn failed_delete_restores_items() {
        let service = Arc::new(ScriptedService::new(two_pages()));
        let (feed, mutations) = loaded(&service).await;
        service.fail_deletes_with(Error::FetchFailed("server unavailable".to_owned()));
        let before = feed.items();

        let result = mutations.delete_many(&[2, 6]).await;

        assert_eq!(result, Err(Error::FetchFailed("server unavailable".to_owned())));
        assert_eq!(service.mutation_calls(), 1);
        assert_eq!(feed.items(), before);
        assert!(!feed.is_mutating());
        assert_eq!(mutations.invalidations().generation(DependentQuery::AccountBalances), 0);
    }

    #[tokio::test]
    async fn successful_delete_keeps_removal_and_invalidates() {
        let service = Arc::new(ScriptedService::new(two_pages()));
        let (feed, mutations) = loaded(&service).await;
        let mut receiver = mutations.invalidations().subscribe();

        mutations.delete_many(&[2, 6]).await.unwrap();

        let ids: Vec<i64> = feed.items().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 4, 5, 7, 8]);
        assert_eq!(service.deletes(), vec![vec![2, 6]]);
        assert_eq!(receiver.recv().await.unwrap(), DependentQuery::AccountBalances);
        assert_eq!(receiver.recv().await.unwrap(), DependentQuery::TransactionSummary);
        assert_eq!(mutations.invalidations().generation(DependentQuery::TransactionSummary), 1);
        assert_eq!(service.list_calls(), 2, "deletes do not refetch");
    }

    #[tokio::test]
    async fn items_are_removed_before_service_confirms() {
        let service = Arc::new(ScriptedService::gated(two_pages()));
        service.release(2);
        let (feed, mutations) = loaded(&service).await;

        let (result, during) = tokio::join!(mutations.delete_one(3), async {
            let during = feed.items().len();
            service.release(1);
            during
        });

        result.unwrap();
        assert_eq!(during, 7);
        assert_eq!(feed.items().len(), 7);
        assert_eq!(service.mutation_calls(), 1);
    }

    #[tokio::test]
    async fn delete_is_pending_until_service_answers() {
        let service = Arc::new(ScriptedService::gated(two_pages()));
        service.release(2);
        let (_feed, mutations) = loaded(&service).await;

        let (result, during) = tokio::join!(mutations.delete_one(3), async {
            tokio::task::yield_now().await;
            let during = mutations.is_pending();
            service.release(1);
            during
        });

        result.unwrap();
        assert!(during);
        assert!(!mutations.is_pending());
    }

    #[tokio::test]
    async fn second_delete_while_pending_is_rejected() {
        let service = Arc::new(ScriptedService::gated(two_pages()));
        service.release(2);
        let (feed, mutations) = loaded(&service).await;

        let (first, second) = tokio::join!(mutations.delete_one(1), async {
            let second = mutations.delete_one(2).await;
            service.release(1);
            second
        });

        assert_eq!(first, Ok(()));
        assert_eq!(second, Err(Error::MutationInFlight));
        assert_eq!(service.deletes(), vec![vec![1]]);
        assert_eq!(service.mutation_calls(), 1, "the rejected delete never reaches the service");
        assert_eq!(feed.items().len(), 7);
    }

    #[tokio::test]
    async fn rollback_is_skipped_after_session_change() {
        let service = Arc::new(ScriptedService::gated(two_pages()));
        service.release(2);
        let (feed, mutations) = loaded(&service).await;
        service.fail_deletes_with(Error::FetchFailed("timeout".to_owned()));

        let (result, _) = tokio::join!(mutations.delete_one(1), async {
            feed.set_query(TransactionQuery::default().account(2));
            service.release(1);
        });

        assert!(result.is_err());
        assert!(feed.items().is_empty());
        assert!(!feed.is_mutating());
        assert_eq!(service.mutation_calls(), 1);
    }

    #[tokio::test]
    async fn create_invalidates_and_reloads() {
        let mut pages = two_pages();
        pages.push(page(transactions(1, 2), Some("fresh")));
        let service = Arc::new(ScriptedService::new(pages));
        let (feed, mutations) = loaded(&service).await;
        let session = feed.session();

        let builder = Transaction::build(
            1,
            datetime!(2024-02-01 09:00 UTC).into(),
            Direction::Incoming,
            Amount::new("USD", 5, 0).unwrap(),
        );
        let created = mutations.create(builder).await.unwrap();

        assert_eq!(created.id, 1_000);
        assert_eq!(service.mutation_calls(), 1);
        assert!(feed.session() > session);
        assert_eq!(feed.items().len(), 2);
        assert_eq!(mutations.invalidations().generation(DependentQuery::AccountBalances), 1);
    }

    #[tokio::test]
    async fn failed_update_changes_nothing() {
        let service = Arc::new(ScriptedService::new(two_pages()));
        let (feed, mutations) = loaded(&service).await;
        let session = feed.session();

        let result = mutations.update(TransactionUpdate::new(1)).await;

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
        assert_eq!(service.mutation_calls(), 1);
        assert!(!mutations.is_pending());
        assert_eq!(feed.session(), session);
        assert_eq!(mutations.invalidations().generation(DependentQuery::TransactionSummary), 0);
    }
}
