//! SQLite DDL for component tables.
//!
//! Renders a [`TableModel`] with SQLite type affinities so a component table
//! can be created in a local database file. Primary-key and unique flags are
//! inline column constraints; regular indexes become `CREATE INDEX`
//! statements named `idx_<table>_<column>`, since SQLite index names share
//! one namespace per database.

use modelsync_core::{FieldSpec, FieldType, TableModel, default_literal, is_valid_identifier};

use crate::error::{Result, SqliteError};

/// Validates a table or column name before it is spliced into SQL.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(SqliteError::InvalidIdentifier(name.to_string()))
    }
}

/// Double-quotes a validated identifier.
pub(crate) fn quote(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{name}\""))
}

/// Storage affinity used for a semantic type.
pub fn affinity(field_type: FieldType) -> &'static str {
    match field_type {
        ty if ty.is_integer() => "INTEGER",
        FieldType::Bool => "INTEGER",
        FieldType::Float | FieldType::Double | FieldType::Real => "REAL",
        FieldType::Decimal => "NUMERIC",
        ty if ty.is_blob() => "BLOB",
        _ => "TEXT",
    }
}

fn column_sql(field: &FieldSpec) -> Result<String> {
    let mut parts = vec![quote(&field.name)?, affinity(field.field_type).to_string()];
    if !field.nullable {
        parts.push("NOT NULL".to_string());
    }
    if field.index.primary {
        parts.push("PRIMARY KEY".to_string());
    }
    if field.index.unique {
        parts.push("UNIQUE".to_string());
    }
    if let Some(default) = default_literal(field) {
        let default = if default == "NOW()" {
            "CURRENT_TIMESTAMP".to_string()
        } else {
            default
        };
        parts.push(format!("DEFAULT {default}"));
    }
    Ok(parts.join(" "))
}

/// Generates the statements creating `model` if it does not exist.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidIdentifier`] for names that cannot be
/// quoted safely.
///
/// # Examples
///
/// ```
/// use modelsync_core::{FieldSpec, FieldType, TableModel};
/// use modelsync_sqlite::create_table_sql;
///
/// let model = TableModel::new(
///     "levels",
///     vec![
///         FieldSpec::new("id", FieldType::Int).length(11).primary(),
///         FieldSpec::new("name", FieldType::VarChar).length(20).indexed(),
///     ],
///     vec![],
/// )
/// .unwrap();
///
/// let sql = create_table_sql(&model).unwrap();
/// assert_eq!(
///     sql[0],
///     "CREATE TABLE IF NOT EXISTS \"levels\" (\"id\" INTEGER NOT NULL PRIMARY KEY, \"name\" TEXT NOT NULL)"
/// );
/// assert_eq!(
///     sql[1],
///     "CREATE INDEX IF NOT EXISTS \"idx_levels_name\" ON \"levels\" (\"name\")"
/// );
/// ```
pub fn create_table_sql(model: &TableModel) -> Result<Vec<String>> {
    let table = quote(model.name())?;
    let columns = model
        .fields()
        .iter()
        .map(column_sql)
        .collect::<Result<Vec<_>>>()?;

    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        columns.join(", ")
    )];
    for field in model.fields().iter().filter(|f| f.index.indexed) {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{}_{}\" ON {table} ({})",
            model.name(),
            field.name,
            quote(&field.name)?
        ));
    }
    Ok(statements)
}
