//! Live schema introspection.
//!
//! [`introspect`] turns the catalog view of one table into a list of
//! [`ColumnSnapshot`]s. Index flags are derived from index names: MySQL's own
//! `PRIMARY` marker, and the `idx_`/`unq_` prefixes this crate uses when it
//! creates indexes. Indexes named any other way are not recognised.

use modelsync_core::{INDEX_PREFIX, UNIQUE_PREFIX, quote_ident};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::database::{Database, scalar_int};
use crate::error::{DriverError, Result, SyncError};

const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_name = ?";

const CURRENT_DATABASE_SQL: &str = "SELECT DATABASE()";

const COLUMN_INDEXES_SQL: &str = "SELECT column_name, index_name, non_unique \
     FROM information_schema.statistics \
     WHERE table_schema = ? AND table_name = ? AND column_name = ?";

/// Name MySQL reports for the primary-key index.
pub const PRIMARY_INDEX: &str = "PRIMARY";

/// Introspected state of one live column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    /// Column name.
    pub field: String,
    /// Raw column type as reported by the server, e.g. `varchar(100)`.
    #[serde(rename = "type")]
    pub column_type: String,
    /// `"YES"` or `"NO"`.
    #[serde(default)]
    pub nullable: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub default: Option<String>,
    /// Extra metadata such as `auto_increment`.
    #[serde(default)]
    pub extra: String,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_indexed: bool,
    #[serde(default)]
    pub is_primary: bool,
}

impl ColumnSnapshot {
    pub fn is_nullable(&self) -> bool {
        self.nullable.eq_ignore_ascii_case("YES")
    }

    pub fn is_auto_increment(&self) -> bool {
        self.extra.to_ascii_lowercase().contains("auto_increment")
    }

    /// Applies one index name to the derived flags.
    pub fn classify_index(&mut self, index_name: &str) {
        if index_name == PRIMARY_INDEX {
            self.is_primary = true;
            return;
        }
        match index_name.split('_').next() {
            Some(prefix) if prefix == INDEX_PREFIX => self.is_indexed = true,
            Some(prefix) if prefix == UNIQUE_PREFIX => self.is_unique = true,
            _ => {}
        }
    }
}

/// Reads the live definition of `table`.
///
/// Returns an empty list when the table does not exist yet.
///
/// # Errors
///
/// Returns [`SyncError::Connectivity`] if the database does not answer a
/// ping, and [`SyncError::Introspection`] if any catalog query fails.
pub fn introspect(db: &dyn Database, table: &str) -> Result<Vec<ColumnSnapshot>> {
    db.ping().map_err(|source| SyncError::Connectivity {
        attempts: 1,
        source,
    })?;

    let failed = |source: DriverError| SyncError::Introspection {
        table: table.to_string(),
        source,
    };

    let exists = scalar_int(db, TABLE_EXISTS_SQL, &[json!(table)]).map_err(failed)?;
    if exists == 0 {
        debug!(table, "table does not exist");
        return Ok(Vec::new());
    }

    let rows = db
        .query(&format!("SHOW COLUMNS FROM {}", quote_ident(table)), &[])
        .map_err(failed)?;

    let schema = db
        .query_row(CURRENT_DATABASE_SQL, &[])
        .map_err(failed)?
        .and_then(|row| row.text(0))
        .ok_or_else(|| failed(DriverError::new("no database selected")))?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let mut column = ColumnSnapshot {
            field: row.text(0).unwrap_or_default(),
            column_type: row.text(1).unwrap_or_default(),
            nullable: row.text(2).unwrap_or_default(),
            key: row.text(3).unwrap_or_default(),
            default: row.text(4),
            extra: row.text(5).unwrap_or_default(),
            ..ColumnSnapshot::default()
        };

        let args: [Value; 3] = [json!(schema), json!(table), json!(column.field)];
        for index in db.query(COLUMN_INDEXES_SQL, &args).map_err(failed)? {
            if let Some(name) = index.text(1) {
                column.classify_index(&name);
            }
        }

        debug!(
            table,
            column = %column.field,
            column_type = %column.column_type,
            primary = column.is_primary,
            unique = column.is_unique,
            indexed = column.is_indexed,
            "introspected column"
        );
        columns.push(column);
    }

    Ok(columns)
}
