use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::{
    Error,
    database_id::TransactionId,
    service::{Cursor, ListRequest, Page, TransactionService},
    transaction::{Transaction, TransactionBuilder, TransactionUpdate},
};

/// A transaction service that replays scripted responses.
///
/// When gated, every call waits for a permit from [ScriptedService::release]
/// so tests can observe the feed while a request is in flight.
pub struct ScriptedService {
    pages: Mutex<VecDeque<Result<Page, Error>>>,
    requests: Mutex<Vec<ListRequest>>,
    deletes: Mutex<Vec<Vec<TransactionId>>>,
    delete_error: Mutex<Option<Error>>,
    list_calls: AtomicUsize,
    mutation_calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl ScriptedService {
    pub fn new(pages: Vec<Result<Page, Error>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            delete_error: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            mutation_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(pages: Vec<Result<Page, Error>>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(pages)
        }
    }

    /// Let `count` gated calls complete.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    pub fn push_page(&self, page: Result<Page, Error>) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn fail_deletes_with(&self, error: Error) {
        *self.delete_error.lock().unwrap() = Some(error);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ListRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<Vec<TransactionId>> {
        self.deletes.lock().unwrap().clone()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate is never closed").forget();
        }
    }
}

/// A page of `transactions` followed by `next` if given.
pub fn page(transactions: Vec<Transaction>, next: Option<&str>) -> Result<Page, Error> {
    Ok(Page::new(transactions, next.and_then(Cursor::new)))
}

#[async_trait]
impl TransactionService for ScriptedService {
    async fn list(&self, request: ListRequest) -> Result<Page, Error> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.wait_for_gate().await;

        let next = self.pages.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Page::default()))
    }

    async fn bulk_delete(&self, ids: &[TransactionId]) -> Result<(), Error> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.deletes.lock().unwrap().push(ids.to_vec());
        self.wait_for_gate().await;

        match self.delete_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn create(&self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;

        Ok(Transaction {
            id: 1_000,
            account_id: builder.account_id,
            occurred_at: Some(builder.occurred_at),
            direction: builder.direction,
            amount: builder.amount,
            category_id: builder.category_id,
            merchant: builder.merchant,
            description: builder.description,
            user_notes: builder.user_notes,
            category_manually_set: false,
            merchant_manually_set: false,
        })
    }

    async fn update(&self, update: TransactionUpdate) -> Result<Transaction, Error> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;

        tracing::debug!("Scripted update of transaction {} always fails", update.id);
        Err(Error::UpdateMissingTransaction)
    }
}
