//! Error types for the SQLite component store.
//!
//! [`SqliteError`] is converted into a
//! [`DriverError`](modelsync_db::DriverError) at the
//! [`ComponentStore`](modelsync_db::ComponentStore) boundary.

use modelsync_db::DriverError;
use thiserror::Error;

/// Errors that can occur during SQLite component operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Table or column name cannot be used as an identifier.
    #[error("invalid identifier '{0}': must start with a letter and contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),

    /// A record without columns cannot be inserted.
    #[error("empty record for table '{0}'")]
    EmptyRecord(String),

    /// An update matched no row.
    #[error("no row in '{table}' where {column} = {key}")]
    RowNotFound {
        table: String,
        column: String,
        key: String,
    },

    /// A JSON value could not be serialized for storage.
    #[error("conversion error: {0}")]
    ConversionError(#[from] serde_json::Error),
}

impl From<SqliteError> for DriverError {
    fn from(err: SqliteError) -> Self {
        DriverError::new(err)
    }
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
