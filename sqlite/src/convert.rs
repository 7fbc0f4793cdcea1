//! Conversion between JSON component values and SQLite values.
//!
//! Booleans are stored as integers, arrays and objects as JSON text, and
//! blobs come back as arrays of byte values. Non-finite reals read back as
//! `null`.

use modelsync_db::PrimaryKey;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::Value;

use crate::error::Result;

/// Converts a JSON value into a bindable SQLite value.
pub(crate) fn json_to_sql(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(serde_json::to_string(value)?),
    })
}

/// Converts a column value read from SQLite into JSON.
pub(crate) fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

pub(crate) fn key_to_sql(key: &PrimaryKey) -> SqlValue {
    match key {
        PrimaryKey::Int(i) => SqlValue::Integer(*i),
        PrimaryKey::Text(s) => SqlValue::Text(s.clone()),
    }
}
