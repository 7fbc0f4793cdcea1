//! [`ComponentStore`] over a rusqlite [`Connection`].

use modelsync_core::TableModel;
use modelsync_db::{ComponentStore, DriverError, PrimaryKey, Record};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params, params_from_iter};
use tracing::debug;

use crate::convert::{json_to_sql, key_to_sql, sql_to_json};
use crate::error::{Result, SqliteError};
use crate::schema::{create_table_sql, quote};

/// Component rows stored in a SQLite database.
///
/// # Examples
///
/// ```
/// use modelsync_core::{FieldSpec, FieldType, TableModel};
/// use modelsync_db::ComponentStore;
/// use modelsync_sqlite::SqliteComponentStore;
/// use rusqlite::Connection;
/// use serde_json::json;
///
/// let conn = Connection::open_in_memory().unwrap();
/// let store = SqliteComponentStore::new(&conn);
/// let model = TableModel::new(
///     "levels",
///     vec![
///         FieldSpec::new("id", FieldType::Int).length(11).primary(),
///         FieldSpec::new("name", FieldType::VarChar).length(20),
///     ],
///     vec![],
/// )
/// .unwrap();
/// store.ensure_table(&model).unwrap();
///
/// let row = json!({"id": 1, "name": "one"}).as_object().cloned().unwrap();
/// store.insert("levels", &row).unwrap();
/// assert_eq!(store.fetch_all("levels").unwrap(), vec![row]);
/// ```
pub struct SqliteComponentStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteComponentStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Creates the table for `model` if it does not exist yet.
    pub fn ensure_table(&self, model: &TableModel) -> Result<()> {
        let statements = create_table_sql(model)?;
        self.conn.execute_batch(&statements.join(";\n"))?;
        debug!(table = model.name(), "ensured component table");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        self.conn
    }

    fn rows(&self, table: &str) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!("SELECT * FROM {}", quote(table)?))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt
            .query_map([], |row| {
                let mut record = Record::new();
                for (i, column) in columns.iter().enumerate() {
                    record.insert(column.clone(), sql_to_json(row.get_ref(i)?));
                }
                Ok(record)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_row(&self, table: &str, record: &Record) -> Result<()> {
        if record.is_empty() {
            return Err(SqliteError::EmptyRecord(table.to_string()));
        }
        let columns = record
            .keys()
            .map(|c| quote(c))
            .collect::<Result<Vec<_>>>()?;
        let values = record
            .values()
            .map(json_to_sql)
            .collect::<Result<Vec<SqlValue>>>()?;
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();

        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table)?,
                columns.join(", "),
                placeholders.join(", ")
            ),
            params_from_iter(values),
        )?;
        Ok(())
    }

    fn delete_row(&self, table: &str, column: &str, key: &PrimaryKey) -> Result<()> {
        let deleted = self.conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", quote(table)?, quote(column)?),
            params![key_to_sql(key)],
        )?;
        debug!(table, key = %key, deleted, "deleted rows");
        Ok(())
    }

    fn update_row(
        &self,
        table: &str,
        key_column: &str,
        key: &PrimaryKey,
        column: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} = ?1 WHERE {} = ?2",
                quote(table)?,
                quote(column)?,
                quote(key_column)?
            ),
            params![json_to_sql(value)?, key_to_sql(key)],
        )?;
        if changed == 0 {
            return Err(SqliteError::RowNotFound {
                table: table.to_string(),
                column: key_column.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

impl ComponentStore for SqliteComponentStore<'_> {
    fn fetch_all(&self, table: &str) -> std::result::Result<Vec<Record>, DriverError> {
        Ok(self.rows(table)?)
    }

    fn insert(&self, table: &str, record: &Record) -> std::result::Result<(), DriverError> {
        Ok(self.insert_row(table, record)?)
    }

    fn delete_where(
        &self,
        table: &str,
        column: &str,
        key: &PrimaryKey,
    ) -> std::result::Result<(), DriverError> {
        Ok(self.delete_row(table, column, key)?)
    }

    fn update_field(
        &self,
        table: &str,
        key_column: &str,
        key: &PrimaryKey,
        column: &str,
        value: &serde_json::Value,
    ) -> std::result::Result<(), DriverError> {
        Ok(self.update_row(table, key_column, key, column, value)?)
    }
}
