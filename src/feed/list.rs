//! One transaction list view: its feed, selection and load triggers together.

use std::{sync::Arc, time::Instant};

use maud::Markup;

use crate::{
    Error,
    config::FeedConfig,
    database_id::TransactionId,
    selection::{Modifiers, SelectionMode, SelectionState},
    service::TransactionService,
    transaction::{
        Calendar, DayGroup, SelectionSummary, Transaction, TransactionBuilder, TransactionUpdate,
        group_by_day,
    },
    view::{MutationStatus, transaction_list_view},
};

use super::{
    Bounds, FeedController, FeedView, Invalidations, LoadOutcome, LoadRequests, LoadTrigger,
    MutationCoordinator, ScrollMetrics, ScrollPoller, SessionId, TransactionQuery, TriggerSource,
    ViewportSentinel,
};

/// The state behind one transaction list on screen.
///
/// Create one per list view. The selection and the last failed change belong
/// to the current session and are dropped whenever the session changes, so
/// global indices never point into a different list.
pub struct TransactionList<S> {
    feed: FeedController<S>,
    mutations: MutationCoordinator<S>,
    selection: SelectionState,
    selection_session: SessionId,
    mutation_error: Option<Error>,
    calendar: Calendar,
    sentinel: ViewportSentinel,
    scroll: ScrollPoller,
    trigger: LoadTrigger,
}

impl<S: TransactionService> TransactionList<S> {
    /// Create a list for `query`.
    ///
    /// The returned [LoadRequests] must be driven by
    /// [run_load_requests](super::run_load_requests) for the sentinel and
    /// scroll triggers to load pages.
    pub fn new(
        service: Arc<S>,
        query: TransactionQuery,
        calendar: Calendar,
        config: FeedConfig,
    ) -> (Self, LoadRequests) {
        let sentinel = ViewportSentinel::new(config.sentinel_margin_px);
        let scroll = ScrollPoller::new(config.scroll_threshold_px, config.scroll_throttle);
        let feed = FeedController::new(service, query, config);
        let mutations = MutationCoordinator::new(feed.clone(), Invalidations::default());
        let (trigger, requests) = LoadTrigger::channel();

        let list = Self {
            selection_session: feed.session(),
            feed,
            mutations,
            selection: SelectionState::new(),
            mutation_error: None,
            calendar,
            sentinel,
            scroll,
            trigger,
        };

        (list, requests)
    }

    /// The list's feed.
    pub fn feed(&self) -> &FeedController<S> {
        &self.feed
    }

    /// The invalidations published after changes made through this list.
    pub fn invalidations(&self) -> &Invalidations {
        self.mutations.invalidations()
    }

    /// The calendar used to group and label days.
    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// The current selection.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// The error of the last create, update or delete, if it failed.
    ///
    /// Cleared by the next successful change and by any session change.
    pub fn mutation_error(&self) -> Option<&Error> {
        self.mutation_error
            .as_ref()
            .filter(|_| self.selection_session == self.feed.session())
    }

    /// Whether a create, update or delete has not finished yet.
    pub fn is_mutating(&self) -> bool {
        self.mutations.is_pending() || self.feed.is_mutating()
    }

    /// Switch to `query`, clearing the selection if the session changed.
    pub fn set_query(&mut self, query: TransactionQuery) -> bool {
        let changed = self.feed.set_query(query);
        self.sync_selection();
        changed
    }

    /// Fetch the next page. See [FeedController::load_more].
    ///
    /// # Errors
    /// Returns the service's error if the fetch failed.
    pub async fn load_more(&self) -> Result<LoadOutcome, Error> {
        self.feed.load_more().await
    }

    /// Reload from the first page. The selection is cleared.
    ///
    /// # Errors
    /// Returns the service's error if the fetch failed.
    pub async fn refetch(&mut self) -> Result<LoadOutcome, Error> {
        let outcome = self.feed.refetch().await;
        self.sync_selection();
        outcome
    }

    /// Handle a click on the row of transaction `id` at `global_index`.
    ///
    /// Returns the mode the click was handled with. [SelectionMode::Replace]
    /// leaves the selection alone so the caller can open the transaction instead.
    pub fn click_transaction(
        &mut self,
        id: TransactionId,
        global_index: usize,
        modifiers: Modifiers,
    ) -> SelectionMode {
        self.sync_selection();
        let mode = SelectionMode::from_modifiers(modifiers);
        let items = self.feed.items();

        match items.get(global_index) {
            Some(transaction) if transaction.id == id => {
                self.selection
                    .toggle_selection(&items, id, global_index, mode);
            }
            _ => tracing::warn!(
                "Ignoring click on transaction {id}, it is not at index {global_index} of the list"
            ),
        }

        mode
    }

    /// Handle a click on the header of the day `date_key`.
    ///
    /// Returns false if no loaded day has that key.
    pub fn click_day_header(&mut self, date_key: &str, modifiers: Modifiers) -> bool {
        self.sync_selection();
        let mode = SelectionMode::from_modifiers(modifiers);
        let items = self.feed.items();
        let groups = group_by_day(&items, &self.calendar);

        let Some(group) = groups.iter().find(|group| group.date_key == date_key) else {
            tracing::warn!("Ignoring click on day {date_key}, it is not in the list");
            return false;
        };

        self.selection.toggle_day(&items, &group.transactions, mode);
        true
    }

    /// Deselect everything.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// The selected transactions in list order.
    pub fn selected(&self) -> Vec<Transaction> {
        self.selection
            .selected_in(&self.feed.items())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Totals for the selected transactions.
    pub fn selection_summary(&self) -> SelectionSummary {
        SelectionSummary::from_transactions(&self.selected())
    }

    /// Delete every selected transaction. The selection is cleared on success
    /// and kept if the delete fails.
    ///
    /// # Errors
    /// See [MutationCoordinator::delete_many].
    pub async fn delete_selected(&mut self) -> Result<(), Error> {
        self.sync_selection();
        let ids: Vec<TransactionId> = self.selected().iter().map(|t| t.id).collect();

        let result = self.mutations.delete_many(&ids).await;
        self.sync_selection();
        self.record_mutation(result)?;
        self.selection.clear();

        Ok(())
    }

    /// Delete one transaction, deselecting it on success.
    ///
    /// # Errors
    /// See [MutationCoordinator::delete_one].
    pub async fn delete_transaction(&mut self, id: TransactionId) -> Result<(), Error> {
        self.sync_selection();
        let index = self.feed.items().iter().position(|t| t.id == id);

        let result = self.mutations.delete_one(id).await;
        self.sync_selection();
        self.record_mutation(result)?;
        self.selection.deselect(&[id]);
        if let Some(index) = index {
            self.selection.rows_removed(&[index]);
        }

        Ok(())
    }

    /// Create a transaction and reload the list.
    ///
    /// # Errors
    /// Returns the service's error if the create failed.
    pub async fn create(&mut self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        let result = self.mutations.create(builder).await;
        self.sync_selection();
        self.record_mutation(result)
    }

    /// Update a transaction and reload the list.
    ///
    /// # Errors
    /// Returns the service's error if the update failed.
    pub async fn update(&mut self, update: TransactionUpdate) -> Result<Transaction, Error> {
        let result = self.mutations.update(update).await;
        self.sync_selection();
        self.record_mutation(result)
    }

    /// Report where the load-more sentinel is. Returns whether a load was queued.
    pub fn on_sentinel(&self, sentinel: Bounds, viewport: Bounds) -> bool {
        self.feed.has_more()
            && self.sentinel.is_triggered(sentinel, viewport)
            && self.trigger.request(TriggerSource::Sentinel)
    }

    /// Report a scroll event. Returns whether a load was queued.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> bool {
        self.scroll.on_scroll(metrics, now)
            && self.feed.has_more()
            && self.trigger.request(TriggerSource::Scroll)
    }

    /// A snapshot of the feed.
    pub fn view(&self) -> FeedView {
        self.feed.view()
    }

    /// Group the transactions in `view` by day.
    pub fn day_groups<'a>(&self, view: &'a FeedView) -> Vec<DayGroup<'a>> {
        group_by_day(&view.items, &self.calendar)
    }

    /// Render the list as HTML.
    pub fn render(&self) -> Markup {
        let view = self.view();
        let groups = self.day_groups(&view);
        let account_scoped = self.feed.query().account_id.is_some();

        transaction_list_view(
            &view,
            &groups,
            &self.selection,
            &self.calendar,
            account_scoped,
            MutationStatus {
                error: self.mutation_error(),
                is_pending: self.is_mutating(),
            },
        )
    }

    fn record_mutation<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => self.mutation_error = None,
            Err(error) => self.mutation_error = Some(error.clone()),
        }

        result
    }

    fn sync_selection(&mut self) {
        let session = self.feed.session();

        if session != self.selection_session {
            tracing::debug!("Session changed to {session}, clearing selection");
            self.selection.clear();
            self.mutation_error = None;
            self.selection_session = session;
        }
    }
}
