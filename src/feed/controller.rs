//! Cursor-paged loading of the transaction feed.
//!
//! A [FeedController] owns the page cache of the current paging session. Every
//! change of [TransactionQuery] starts a new session, and every async result is
//! compared against the session it was started for before it is applied, so a
//! late response can never leak into a newer session.

use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;

use crate::{
    Error,
    config::FeedConfig,
    database_id::TransactionId,
    service::{ListRequest, TransactionService},
    transaction::Transaction,
};

use super::{CacheSnapshot, PageCache, TransactionQuery};

/// Identifies one paging session. Later sessions have larger IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct SessionId(u64);

impl SessionId {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a call to load the next page did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and appended.
    Loaded,
    /// A fetch for the current session is already in flight, nothing was requested.
    AlreadyLoading,
    /// The last page has already been fetched.
    NoMorePages,
    /// The session changed while the page was in flight and the page was dropped.
    Discarded,
    /// An earlier fetch failed, automatic loading waits for the caller to retry.
    Halted,
}

/// Who asked for the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The caller, e.g. a retry button. Always allowed to retry after an error.
    Caller,
    /// The sentinel or scroll poller.
    Trigger,
}

/// A snapshot of the feed for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView {
    /// All loaded transactions of the current session in fetch order.
    pub items: Vec<Transaction>,
    /// Whether the first page is being fetched.
    pub is_loading: bool,
    /// Whether a later page is being fetched.
    pub is_loading_more: bool,
    /// Whether there may be more pages to fetch.
    pub has_more: bool,
    /// The error from the last failed fetch, cleared by the next successful one.
    pub error: Option<Error>,
    /// The session the view was taken from.
    pub session: SessionId,
}

#[derive(Debug)]
struct FeedState {
    query: TransactionQuery,
    session: SessionId,
    cache: PageCache,
    in_flight: Option<SessionId>,
    error: Option<Error>,
    mutation_in_flight: bool,
}

impl FeedState {
    fn start_session(&mut self, query: TransactionQuery) {
        self.query = query;
        self.session = self.session.next();
        self.cache = PageCache::default();
        self.in_flight = None;
        self.error = None;
    }

    fn is_fetching(&self) -> bool {
        self.in_flight == Some(self.session)
    }
}

/// Loads pages of transactions for the current query.
///
/// This is a cheap handle, clones share the same feed.
pub struct FeedController<S> {
    service: Arc<S>,
    config: FeedConfig,
    state: Arc<Mutex<FeedState>>,
}

impl<S> Clone for FeedController<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: TransactionService> FeedController<S> {
    /// Create a feed for `query`. Nothing is fetched until [FeedController::load_more].
    pub fn new(service: Arc<S>, query: TransactionQuery, config: FeedConfig) -> Self {
        Self {
            service,
            config,
            state: Arc::new(Mutex::new(FeedState {
                query,
                session: SessionId::default(),
                cache: PageCache::default(),
                in_flight: None,
                error: None,
                mutation_in_flight: false,
            })),
        }
    }

    /// The service pages are fetched from.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// The feed's config.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// The query of the current session.
    pub fn query(&self) -> TransactionQuery {
        self.state().query.clone()
    }

    /// The current session.
    pub fn session(&self) -> SessionId {
        self.state().session
    }

    /// Switch to `query`.
    ///
    /// A different query starts a new session, dropping loaded pages, the error
    /// and any in-flight fetch. Returns whether the session changed.
    pub fn set_query(&self, query: TransactionQuery) -> bool {
        let mut state = self.state();

        if state.query == query {
            return false;
        }

        state.start_session(query);
        tracing::info!("Query changed, started session {}", state.session);

        true
    }

    /// Fetch the next page of the current session.
    ///
    /// Does nothing while a fetch for the current session is in flight or once
    /// the last page has been loaded.
    ///
    /// # Errors
    /// Returns the service's error if the fetch failed. The error is also kept
    /// in [FeedView::error] and pages loaded so far are kept.
    pub async fn load_more(&self) -> Result<LoadOutcome, Error> {
        self.load(LoadSource::Caller).await
    }

    /// Restart the current query in a new session and fetch its first page.
    ///
    /// # Errors
    /// Returns the service's error if the fetch failed.
    pub async fn refetch(&self) -> Result<LoadOutcome, Error> {
        {
            let mut state = self.state();
            let query = state.query.clone();
            state.start_session(query);
            tracing::info!("Refetching, started session {}", state.session);
        }

        self.load(LoadSource::Caller).await
    }

    /// Fetch the next page on behalf of `source`.
    ///
    /// Both the caller and the load triggers go through this, so the in-flight
    /// guard covers all of them.
    ///
    /// # Errors
    /// Returns the service's error if the fetch failed.
    pub async fn load(&self, source: LoadSource) -> Result<LoadOutcome, Error> {
        let (session, request) = {
            let mut state = self.state();

            if state.is_fetching() {
                tracing::debug!("Skipping {source:?} load, session {} is already fetching", state.session);
                return Ok(LoadOutcome::AlreadyLoading);
            }

            if source == LoadSource::Trigger && state.error.is_some() {
                tracing::debug!("Skipping triggered load, session {} has an error", state.session);
                return Ok(LoadOutcome::Halted);
            }

            if !state.cache.has_more() {
                return Ok(LoadOutcome::NoMorePages);
            }

            state.in_flight = Some(state.session);
            let request = ListRequest {
                query: state.query.clone(),
                cursor: state.cache.next_cursor().cloned(),
                limit: self.config.page_size,
            };

            (state.session, request)
        };

        let result = self.service.list(request).await;

        let mut state = self.state();
        if state.in_flight == Some(session) {
            state.in_flight = None;
        }

        if state.session != session {
            tracing::debug!(
                "{} (started in session {session}, now in session {})",
                Error::StaleSessionDiscarded,
                state.session
            );
            return Ok(LoadOutcome::Discarded);
        }

        match result {
            Ok(page) => {
                tracing::debug!(
                    "Loaded {} transactions for session {session}, more pages: {}",
                    page.transactions.len(),
                    page.next_cursor.is_some()
                );
                state.cache.push(page);
                state.error = None;
                Ok(LoadOutcome::Loaded)
            }
            Err(error) => {
                tracing::error!("Could not load transactions for session {session}: {error}");
                state.error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// A snapshot of the feed for rendering.
    pub fn view(&self) -> FeedView {
        let state = self.state();
        let fetching = state.is_fetching();

        FeedView {
            items: state.cache.items(),
            is_loading: fetching && state.cache.has_no_pages(),
            is_loading_more: fetching && !state.cache.has_no_pages(),
            has_more: state.cache.has_more(),
            error: state.error.clone(),
            session: state.session,
        }
    }

    /// All loaded transactions in fetch order.
    pub fn items(&self) -> Vec<Transaction> {
        self.state().cache.items()
    }

    /// Whether there may be more pages to fetch.
    pub fn has_more(&self) -> bool {
        self.state().cache.has_more()
    }

    /// Whether an optimistic mutation is waiting on the service.
    pub fn is_mutating(&self) -> bool {
        self.state().mutation_in_flight
    }

    /// Snapshot the cache and remove `ids` from it ahead of a remote delete.
    ///
    /// # Errors
    /// Returns [Error::MutationInFlight] if another optimistic mutation has not
    /// finished yet.
    pub(crate) fn begin_optimistic_delete(
        &self,
        ids: &[TransactionId],
    ) -> Result<CacheSnapshot, Error> {
        let mut state = self.state();

        if state.mutation_in_flight {
            return Err(Error::MutationInFlight);
        }

        state.mutation_in_flight = true;
        let snapshot = state.cache.snapshot(state.session);
        let ids: HashSet<TransactionId> = ids.iter().copied().collect();
        let removed = state.cache.remove_ids(&ids);
        tracing::debug!(
            "Optimistically removed {removed} of {} transactions from session {}",
            ids.len(),
            state.session
        );

        Ok(snapshot)
    }

    /// Mark the pending optimistic mutation as confirmed.
    pub(crate) fn finish_mutation(&self) {
        self.state().mutation_in_flight = false;
    }

    /// Undo the pending optimistic mutation by restoring `snapshot`.
    ///
    /// The snapshot is only restored while its session is still current.
    /// Returns whether it was restored.
    pub(crate) fn rollback(&self, snapshot: CacheSnapshot) -> bool {
        let mut state = self.state();
        state.mutation_in_flight = false;

        if state.session != snapshot.session {
            tracing::warn!(
                "Not rolling back session {}, the feed has moved on to session {}",
                snapshot.session,
                state.session
            );
            return false;
        }

        state.cache.restore(snapshot);
        true
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        // The state is never left half-updated, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
