//! Defines the crate level error type.

use crate::database_id::TransactionId;

/// The errors that may occur in the transaction feed.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    /// There is no active user session.
    ///
    /// Authentication is handled upstream, so the feed treats this like any
    /// other failed remote call.
    #[error("user not authenticated")]
    NotAuthenticated,

    /// A remote list, create, update or delete call failed.
    #[error("request failed: {0}")]
    FetchFailed(String),

    /// A response arrived for a paging session that has since been replaced.
    ///
    /// This is never shown to users, the late response is dropped.
    #[error("response belongs to a stale session and was discarded")]
    StaleSessionDiscarded,

    /// An optimistic mutation is already pending against the feed's cache.
    #[error("another change is still being saved, try again once it finishes")]
    MutationInFlight,

    /// The fractional part of an amount was outside of `0..1_000_000_000` nanos.
    #[error("{0} is not a valid number of nanos")]
    InvalidAmount(u32),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// A cursor could not be decoded by the service that issued it.
    #[error("invalid cursor \"{0}\"")]
    InvalidCursor(String),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete transactions that do not exist.
    #[error("tried to delete transactions that are not in the database: {0:?}")]
    DeleteMissingTransaction(Vec<TransactionId>),

    /// Tried to update a transaction that does not exist.
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(String),

    /// Could not acquire a lock on shared state.
    #[error("could not acquire the lock")]
    DatabaseLockError,

    /// An error occurred while serializing a struct as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::JSONSerializationError(value.to_string())
    }
}
