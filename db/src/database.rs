//! Database execution interface consumed by the introspector and the
//! reconciler.
//!
//! Connection pooling, driver setup and parameter binding live behind
//! [`Database`]; this crate only issues raw SQL text with positional
//! arguments. Values travel as [`serde_json::Value`] so that rows can be
//! inspected without a driver-specific value type.

use serde_json::Value;

use crate::error::DriverError;

/// One result row, columns in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.0.get(idx)
    }

    /// Column `idx` as text; `None` for SQL `NULL` or a missing column.
    ///
    /// Numbers and booleans are rendered to their textual form, matching how
    /// text-protocol drivers hand back catalog values.
    pub fn text(&self, idx: usize) -> Option<String> {
        match self.0.get(idx)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Column `idx` as an integer, accepting numeric strings.
    pub fn int(&self, idx: usize) -> Option<i64> {
        match self.0.get(idx)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Minimal SQL execution surface.
///
/// Implementations wrap a live connection or pool. Every call is an
/// autonomous statement; no transaction spans calls.
pub trait Database {
    /// Verifies that the database is reachable.
    fn ping(&self) -> Result<(), DriverError>;

    /// Runs a query expected to return at most one row.
    fn query_row(&self, sql: &str, args: &[Value]) -> Result<Option<Row>, DriverError>;

    /// Runs a query and returns every row.
    fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DriverError>;

    /// Executes a statement and returns the number of affected rows.
    fn exec(&self, sql: &str, args: &[Value]) -> Result<u64, DriverError>;
}

impl<D: Database + ?Sized> Database for &D {
    fn ping(&self) -> Result<(), DriverError> {
        (**self).ping()
    }

    fn query_row(&self, sql: &str, args: &[Value]) -> Result<Option<Row>, DriverError> {
        (**self).query_row(sql, args)
    }

    fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DriverError> {
        (**self).query(sql, args)
    }

    fn exec(&self, sql: &str, args: &[Value]) -> Result<u64, DriverError> {
        (**self).exec(sql, args)
    }
}

/// Runs `query_row` and returns the first column as an integer.
pub(crate) fn scalar_int(db: &dyn Database, sql: &str, args: &[Value]) -> Result<i64, DriverError> {
    let row = db
        .query_row(sql, args)?
        .ok_or_else(|| DriverError::new(format!("query returned no rows: {sql}")))?;
    row.int(0)
        .ok_or_else(|| DriverError::new(format!("query returned a non-integer value: {sql}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_row_text_and_int_accessors() {
        let row = Row::new(vec![json!("id"), json!(3), json!(null), json!("12"), json!(true)]);
        assert_eq!(row.text(0).as_deref(), Some("id"));
        assert_eq!(row.text(1).as_deref(), Some("3"));
        assert_eq!(row.text(2), None);
        assert_eq!(row.int(1), Some(3));
        assert_eq!(row.int(3), Some(12));
        assert_eq!(row.int(4), Some(1));
        assert_eq!(row.int(0), None);
        assert_eq!(row.text(9), None);
    }
}
