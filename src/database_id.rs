//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of a transaction, unique and stable across pages.
pub type TransactionId = DatabaseId;

/// The ID of the account a transaction belongs to.
pub type AccountId = DatabaseId;

/// The ID of a transaction category.
pub type CategoryId = DatabaseId;
