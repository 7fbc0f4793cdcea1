//! Error types for schema and component synchronisation.
//!
//! [`SyncError`] covers every failure mode of a sync pass; [`DriverError`]
//! is what database and query-builder implementations hand back across the
//! [`Database`](crate::Database) and [`ComponentStore`](crate::ComponentStore)
//! seams.

use std::path::PathBuf;

use modelsync_core::ValidationError;
use thiserror::Error;

/// Failure reported by a database driver or query-builder backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur while synchronising models with a database.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A table declaration failed validation.
    #[error("invalid model '{table}': {source}")]
    Validation {
        table: String,
        #[source]
        source: ValidationError,
    },

    /// The database could not be reached.
    #[error("database unreachable after {attempts} attempt(s): {source}")]
    Connectivity {
        attempts: u32,
        #[source]
        source: DriverError,
    },

    /// A metadata query failed while introspecting a table.
    #[error("introspection of table '{table}' failed: {source}")]
    Introspection {
        table: String,
        #[source]
        source: DriverError,
    },

    /// A single DDL or DML statement failed.
    #[error("{action} on '{table}.{column}' failed: {source}\n  SQL: {sql}")]
    Execution {
        table: String,
        column: String,
        action: String,
        sql: String,
        #[source]
        source: DriverError,
    },

    /// Rows of a component table could not be fetched.
    #[error("fetching components of table '{table}' failed: {source}")]
    Fetch {
        table: String,
        #[source]
        source: DriverError,
    },

    /// Database and local component state disagree and no operator
    /// decision was available.
    #[error("component conflict on table '{0}': database is empty but local components exist")]
    Conflict(String),

    /// Component key is not present in the in-memory set.
    #[error("component '{key}' not found in table '{table}'")]
    NotFound { table: String, key: String },

    /// Component key cannot be coerced to the primary-key column type.
    #[error("component key '{key}' of table '{table}' is not a valid integer primary key")]
    InvalidKey { table: String, key: String },

    /// Component sync requires a primary key.
    #[error("table '{0}' has no PRIMARY KEY field")]
    MissingPrimaryKey(String),

    /// Declared table dependencies form a cycle.
    #[error("dependency cycle between tables: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// Two models registered under the same table name.
    #[error("table '{0}' is already registered")]
    DuplicateTable(String),

    /// Reading or writing a component file failed.
    #[error("component file '{}': {source}", .path.display())]
    ComponentFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A component file is not a valid JSON component set.
    #[error("component file '{}' is malformed: {source}", .path.display())]
    ComponentFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration or model file could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SyncError {
    pub(crate) fn validation(table: &str, source: ValidationError) -> Self {
        SyncError::Validation {
            table: table.to_string(),
            source,
        }
    }
}

/// Convenience alias for results with [`SyncError`].
pub type Result<T> = std::result::Result<T, SyncError>;
