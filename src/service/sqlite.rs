//! Implements a SQLite backed transaction service.
//!
//! Pages are keyset paginated newest first. The cursor records the sort key
//! and ID of the last row on a page, so inserting or deleting rows never shifts
//! later pages.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, Row, params_from_iter, types::Type, types::Value};

use crate::{
    Error,
    database_id::TransactionId,
    feed::TransactionQuery,
    money::Amount,
    transaction::{Direction, Timestamp, Transaction, TransactionBuilder, TransactionUpdate},
};

use super::{Cursor, ListRequest, Page, TransactionService};

/// Sort key for transactions without a timestamp, places them after all dated transactions.
const MISSING_DATE_SORT_KEY: i64 = i64::MIN;

const TRANSACTION_COLUMNS: &str = "id, account_id, occurred_seconds, occurred_nanos, direction, \
    currency_code, units, nanos, category_id, merchant, description, user_notes, \
    category_manually_set, merchant_manually_set";

/// Stores transactions in a SQLite database and serves them like the remote service.
#[derive(Debug, Clone)]
pub struct SqliteTransactionService {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTransactionService {
    /// Create a service for `connection`, creating the transaction table if needed.
    ///
    /// # Errors
    /// Returns an error if the table cannot be created.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Result<Self, Error> {
        {
            let guard = connection.lock().map_err(|_| Error::DatabaseLockError)?;
            create_transaction_table(&guard)?;
        }

        Ok(Self { connection })
    }

    /// Create a service backed by a fresh in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialised.
    pub fn open_in_memory() -> Result<Self, Error> {
        let connection = Connection::open_in_memory()?;
        Self::new(Arc::new(Mutex::new(connection)))
    }

    /// Get the total number of transactions in the database.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is some SQL error.
    pub fn count(&self) -> Result<u64, Error> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(id) FROM \"transaction\"",
            [],
            |row| row.get(0),
        )?;

        u64::try_from(count).map_err(|error| Error::SqlError(error.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::DatabaseLockError)
    }
}

#[async_trait]
impl TransactionService for SqliteTransactionService {
    async fn list(&self, request: ListRequest) -> Result<Page, Error> {
        let connection = self.lock()?;
        list_page(&request, &connection)
    }

    async fn bulk_delete(&self, ids: &[TransactionId]) -> Result<(), Error> {
        let connection = self.lock()?;
        delete_transactions(ids, &connection)
    }

    async fn create(&self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        let connection = self.lock()?;
        create_transaction(builder, &connection)
    }

    async fn update(&self, update: TransactionUpdate) -> Result<Transaction, Error> {
        let connection = self.lock()?;
        update_transaction(update, &connection)
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                occurred_seconds INTEGER,
                occurred_nanos INTEGER NOT NULL DEFAULT 0,
                sort_key INTEGER NOT NULL,
                direction TEXT NOT NULL CHECK (direction IN ('incoming', 'outgoing')),
                currency_code TEXT NOT NULL,
                units INTEGER NOT NULL CHECK (units >= 0),
                nanos INTEGER NOT NULL CHECK (nanos >= 0 AND nanos < 1000000000),
                category_id INTEGER,
                merchant TEXT,
                description TEXT,
                user_notes TEXT,
                category_manually_set INTEGER NOT NULL DEFAULT 0,
                merchant_manually_set INTEGER NOT NULL DEFAULT 0
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_feed_order ON \"transaction\"(sort_key DESC, id DESC);",
        (),
    )?;

    Ok(())
}

/// Map a database row selected with [TRANSACTION_COLUMNS] to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let occurred_seconds: Option<i64> = row.get(2)?;
    let occurred_nanos: i32 = row.get(3)?;
    let direction: String = row.get(4)?;
    let direction = Direction::from_str_opt(&direction)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(4, "direction".to_owned(), Type::Text))?;
    let units: i64 = row.get(6)?;
    let units = u64::try_from(units).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(6, units))?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        occurred_at: occurred_seconds.map(|seconds| Timestamp {
            seconds,
            nanos: occurred_nanos,
        }),
        direction,
        amount: Amount {
            currency_code: row.get(5)?,
            units,
            nanos: row.get(7)?,
        },
        category_id: row.get(8)?,
        merchant: row.get(9)?,
        description: row.get(10)?,
        user_notes: row.get(11)?,
        category_manually_set: row.get(12)?,
        merchant_manually_set: row.get(13)?,
    })
}

fn sort_key(transaction: &Transaction) -> i64 {
    transaction
        .occurred_at
        .map(|timestamp| timestamp.seconds)
        .unwrap_or(MISSING_DATE_SORT_KEY)
}

fn encode_cursor(transaction: &Transaction) -> Option<Cursor> {
    Cursor::new(format!("{}:{}", sort_key(transaction), transaction.id))
}

fn decode_cursor(cursor: &Cursor) -> Result<(i64, TransactionId), Error> {
    let invalid = || Error::InvalidCursor(cursor.as_str().to_owned());
    let (sort_key, id) = cursor.as_str().split_once(':').ok_or_else(invalid)?;

    Ok((
        sort_key.parse().map_err(|_| invalid())?,
        id.parse().map_err(|_| invalid())?,
    ))
}

fn units_to_sql(units: u64) -> Result<i64, Error> {
    i64::try_from(units)
        .map_err(|_| Error::SqlError(format!("{units} units is too large to store")))
}

fn escape_like(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Get the page of transactions after `request.cursor`, newest first.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCursor] if the cursor was not issued by this service,
/// - or [Error::SqlError] if there is some SQL error.
fn list_page(request: &ListRequest, connection: &Connection) -> Result<Page, Error> {
    let query: &TransactionQuery = &request.query;
    let mut where_clause_parts: Vec<String> = Vec::new();
    let mut query_parameters: Vec<Value> = Vec::new();

    if let Some(account_id) = query.account_id {
        where_clause_parts.push("account_id = ?".to_owned());
        query_parameters.push(Value::Integer(account_id));
    }

    if let Some(search) = &query.search {
        where_clause_parts
            .push("(description LIKE ? ESCAPE '\\' OR merchant LIKE ? ESCAPE '\\')".to_owned());
        let pattern = escape_like(search);
        query_parameters.push(Value::Text(pattern.clone()));
        query_parameters.push(Value::Text(pattern));
    }

    if let Some(start) = query.start {
        where_clause_parts.push("occurred_seconds >= ?".to_owned());
        query_parameters.push(Value::Integer(start.unix_timestamp()));
    }

    if let Some(end) = query.end {
        where_clause_parts.push("occurred_seconds <= ?".to_owned());
        query_parameters.push(Value::Integer(end.unix_timestamp()));
    }

    if let Some(min) = &query.amount_min {
        where_clause_parts.push("(units > ? OR (units = ? AND nanos >= ?))".to_owned());
        let units = units_to_sql(min.units)?;
        query_parameters.push(Value::Integer(units));
        query_parameters.push(Value::Integer(units));
        query_parameters.push(Value::Integer(min.nanos as i64));
    }

    if let Some(max) = &query.amount_max {
        where_clause_parts.push("(units < ? OR (units = ? AND nanos <= ?))".to_owned());
        let units = units_to_sql(max.units)?;
        query_parameters.push(Value::Integer(units));
        query_parameters.push(Value::Integer(units));
        query_parameters.push(Value::Integer(max.nanos as i64));
    }

    if let Some(direction) = query.direction {
        where_clause_parts.push("direction = ?".to_owned());
        query_parameters.push(Value::Text(direction.as_str().to_owned()));
    }

    if !query.categories.is_empty() {
        let placeholders = std::iter::repeat_n("?", query.categories.len())
            .collect::<Vec<_>>()
            .join(", ");
        where_clause_parts.push(format!("category_id IN ({placeholders})"));
        query_parameters.extend(query.categories.iter().copied().map(Value::Integer));
    }

    if let Some(cursor) = &request.cursor {
        let (last_sort_key, last_id) = decode_cursor(cursor)?;
        where_clause_parts.push("(sort_key < ? OR (sort_key = ? AND id < ?))".to_owned());
        query_parameters.push(Value::Integer(last_sort_key));
        query_parameters.push(Value::Integer(last_sort_key));
        query_parameters.push(Value::Integer(last_id));
    }

    let mut query_string = format!("SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"");
    if !where_clause_parts.is_empty() {
        query_string.push_str(" WHERE ");
        query_string.push_str(&where_clause_parts.join(" AND "));
    }
    query_string.push_str(" ORDER BY sort_key DESC, id DESC LIMIT ?");
    // One extra row tells us whether there is another page.
    query_parameters.push(Value::Integer(request.limit as i64 + 1));

    let mut transactions = connection
        .prepare(&query_string)?
        .query_map(params_from_iter(query_parameters), map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let next_cursor = if transactions.len() > request.limit as usize {
        transactions.truncate(request.limit as usize);
        transactions.last().and_then(encode_cursor)
    } else {
        None
    };

    Ok(Page::new(transactions, next_cursor))
}

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// Returns an [Error::SqlError] if there is some SQL error.
fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (account_id, occurred_seconds, occurred_nanos, sort_key, \
                direction, currency_code, units, nanos, category_id, merchant, description, \
                user_notes)
             VALUES (?1, ?2, ?3, ?2, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                builder.account_id,
                builder.occurred_at.seconds,
                builder.occurred_at.nanos,
                builder.direction.as_str(),
                builder.amount.currency_code,
                units_to_sql(builder.amount.units)?,
                builder.amount.nanos,
                builder.category_id,
                builder.merchant,
                builder.description,
                builder.user_notes,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Apply the fields set in `update` to an existing transaction.
///
/// Setting the category or merchant marks it as manually set.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `update.id` does not refer to a transaction,
/// - or [Error::SqlError] if there is some other SQL error.
fn update_transaction(
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let mut set_clause_parts: Vec<&str> = Vec::new();
    let mut query_parameters: Vec<Value> = Vec::new();

    if let Some(account_id) = update.account_id {
        set_clause_parts.push("account_id = ?");
        query_parameters.push(Value::Integer(account_id));
    }

    if let Some(occurred_at) = update.occurred_at {
        set_clause_parts.extend(["occurred_seconds = ?", "occurred_nanos = ?", "sort_key = ?"]);
        query_parameters.push(Value::Integer(occurred_at.seconds));
        query_parameters.push(Value::Integer(occurred_at.nanos as i64));
        query_parameters.push(Value::Integer(occurred_at.seconds));
    }

    if let Some(direction) = update.direction {
        set_clause_parts.push("direction = ?");
        query_parameters.push(Value::Text(direction.as_str().to_owned()));
    }

    if let Some(amount) = update.amount {
        set_clause_parts.extend(["currency_code = ?", "units = ?", "nanos = ?"]);
        query_parameters.push(Value::Text(amount.currency_code));
        query_parameters.push(Value::Integer(units_to_sql(amount.units)?));
        query_parameters.push(Value::Integer(amount.nanos as i64));
    }

    if let Some(category_id) = update.category_id {
        set_clause_parts.extend(["category_id = ?", "category_manually_set = 1"]);
        query_parameters.push(Value::Integer(category_id));
    }

    if let Some(merchant) = update.merchant {
        set_clause_parts.extend(["merchant = ?", "merchant_manually_set = 1"]);
        query_parameters.push(Value::Text(merchant));
    }

    if let Some(description) = update.description {
        set_clause_parts.push("description = ?");
        query_parameters.push(Value::Text(description));
    }

    if let Some(user_notes) = update.user_notes {
        set_clause_parts.push("user_notes = ?");
        query_parameters.push(Value::Text(user_notes));
    }

    let query_string = if set_clause_parts.is_empty() {
        format!("SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?")
    } else {
        format!(
            "UPDATE \"transaction\" SET {} WHERE id = ? RETURNING {TRANSACTION_COLUMNS}",
            set_clause_parts.join(", ")
        )
    };
    query_parameters.push(Value::Integer(update.id));

    connection
        .prepare(&query_string)?
        .query_row(params_from_iter(query_parameters), map_transaction_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTransaction,
            error => error.into(),
        })
}

type RowsAffected = usize;

/// Delete every transaction in `ids` in a single SQL transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if none of `ids` exist,
/// - or [Error::SqlError] if there is some other SQL error.
fn delete_transactions(ids: &[TransactionId], connection: &Connection) -> Result<(), Error> {
    if ids.is_empty() {
        return Ok(());
    }

    let tx = connection.unchecked_transaction()?;
    let placeholders = std::iter::repeat_n("?", ids.len())
        .collect::<Vec<_>>()
        .join(", ");
    let rows_affected: RowsAffected = tx.execute(
        &format!("DELETE FROM \"transaction\" WHERE id IN ({placeholders})"),
        params_from_iter(ids.iter()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction(ids.to_vec()));
    }

    tx.commit()?;
    tracing::debug!("Deleted {rows_affected} of {} transactions", ids.len());

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use time::{Duration, macros::datetime};

    use crate::{
        Error,
        feed::TransactionQuery,
        money::Amount,
        service::{Cursor, ListRequest, TransactionService},
        transaction::{Direction, Timestamp, Transaction, TransactionUpdate},
    };

    use super::SqliteTransactionService;

    async fn seeded_service(count: i64) -> SqliteTransactionService {
        let service = SqliteTransactionService::open_in_memory().unwrap();
        let newest = datetime!(2024-01-31 12:00 UTC);

        for i in 0..count {
            let direction = if i % 3 == 0 {
                Direction::Incoming
            } else {
                Direction::Outgoing
            };
            let builder = Transaction::build(
                1 + i % 2,
                Timestamp::from(newest - Duration::hours(i)),
                direction,
                Amount::new("USD", (i * 10) as u64, 0).unwrap(),
            )
            .description(Some(&format!("purchase {i}")))
            .category_id(Some(i % 4));
            service.create(builder).await.unwrap();
        }

        service
    }

    fn request(query: TransactionQuery, cursor: Option<Cursor>, limit: u32) -> ListRequest {
        ListRequest {
            query,
            cursor,
            limit,
        }
    }

    #[tokio::test]
    async fn pages_are_disjoint_and_newest_first() {
        let service = seeded_service(25).await;
        let mut cursor = None;
        let mut seen = Vec::new();
        let mut pages = 0;

        loop {
            let page = service
                .list(request(TransactionQuery::default(), cursor, 10))
                .await
                .unwrap();
            pages += 1;
            seen.extend(page.transactions);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen.len(), 25);
        let unique: HashSet<i64> = seen.iter().map(|t| t.id).collect();
        assert_eq!(unique.len(), 25);
        for pair in seen.windows(2) {
            assert!(pair[0].occurred_at.unwrap().seconds >= pair[1].occurred_at.unwrap().seconds);
        }
    }

    #[tokio::test]
    async fn exact_final_page_has_no_cursor() {
        let service = seeded_service(10).await;

        let page = service
            .list(request(TransactionQuery::default(), None, 10))
            .await
            .unwrap();

        assert_eq!(page.transactions.len(), 10);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn filters_by_account_direction_and_search() {
        let service = seeded_service(12).await;

        let page = service
            .list(request(
                TransactionQuery::default()
                    .account(1)
                    .direction(Direction::Incoming),
                None,
                50,
            ))
            .await
            .unwrap();
        assert!(!page.transactions.is_empty());
        assert!(page.transactions.iter().all(|t| t.account_id == 1 && t.direction == Direction::Incoming));

        let page = service
            .list(request(TransactionQuery::default().search("purchase 11"), None, 50))
            .await
            .unwrap();
        assert_eq!(page.transactions.len(), 1);
        assert_eq!(page.transactions[0].description.as_deref(), Some("purchase 11"));
    }

    #[tokio::test]
    async fn filters_by_amount_and_category() {
        let service = seeded_service(12).await;
        let query = TransactionQuery::default()
            .amounts(
                Some(Amount::new("USD", 20, 0).unwrap()),
                Some(Amount::new("USD", 60, 0).unwrap()),
            )
            .categories(&[1, 2]);

        let page = service.list(request(query, None, 50)).await.unwrap();

        let units: Vec<u64> = page.transactions.iter().map(|t| t.amount.units).collect();
        assert_eq!(units, vec![20, 50, 60]);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let service = seeded_service(3).await;

        let page = service
            .list(request(TransactionQuery::default().search("%"), None, 50))
            .await
            .unwrap();

        assert!(page.transactions.is_empty());
    }

    #[tokio::test]
    async fn rejects_foreign_cursor() {
        let service = seeded_service(3).await;

        let result = service
            .list(request(TransactionQuery::default(), Cursor::new("page-2"), 10))
            .await;

        assert_eq!(result, Err(Error::InvalidCursor("page-2".to_owned())));
    }

    #[tokio::test]
    async fn count_starts_at_zero_and_tracks_creates() {
        let empty = SqliteTransactionService::open_in_memory().unwrap();
        let seeded = seeded_service(3).await;

        assert_eq!(empty.count(), Ok(0));
        assert_eq!(seeded.count(), Ok(3));
    }

    #[tokio::test]
    async fn bulk_delete_removes_all_ids() {
        let service = seeded_service(5).await;

        service.bulk_delete(&[1, 3, 5]).await.unwrap();

        assert_eq!(service.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn bulk_delete_of_missing_ids_fails() {
        let service = seeded_service(2).await;

        let result = service.bulk_delete(&[42]).await;

        assert_eq!(result, Err(Error::DeleteMissingTransaction(vec![42])));
        assert_eq!(service.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn update_marks_category_as_manual() {
        let service = seeded_service(1).await;
        let update = TransactionUpdate {
            category_id: Some(9),
            description: Some("groceries".to_owned()),
            ..TransactionUpdate::new(1)
        };

        let updated = service.update(update).await.unwrap();

        assert_eq!(updated.category_id, Some(9));
        assert!(updated.category_manually_set);
        assert!(!updated.merchant_manually_set);
        assert_eq!(updated.description.as_deref(), Some("groceries"));
    }

    #[tokio::test]
    async fn update_of_missing_transaction_fails() {
        let service = seeded_service(1).await;

        let result = service.update(TransactionUpdate::new(99)).await;

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }
}
