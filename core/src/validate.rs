//! Structural validation of field and table declarations.
//!
//! Catches declarations that could never be turned into valid DDL (bad
//! identifiers, impossible lengths, conflicting index flags, defaults that
//! do not fit the column type) before anything reaches the database.
//!
//! Fields are validated independently on the rayon pool; the table-wide
//! checks (duplicate names, primary-key cardinality) run after every field
//! task has joined. When several fields are invalid, the error of the first
//! one in declaration order is reported.
//!
//! # Examples
//!
//! ```
//! use modelsync_core::*;
//!
//! let ok = FieldSpec::new("name", FieldType::VarChar).length(50);
//! assert!(validate_field(&ok).is_ok());
//!
//! // A nullable primary key is rejected.
//! let bad = FieldSpec::new("id", FieldType::Int).length(11).primary().nullable();
//! assert_eq!(
//!     validate_field(&bad),
//!     Err(ValidationError::NullablePrimaryKey("id".to_string()))
//! );
//! ```

use std::collections::HashSet;

use rayon::prelude::*;
use thiserror::Error;

use crate::types::{FieldSpec, FieldType};

/// Reserved words that may not be used as column names.
const SQL_KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BACKUP", "BETWEEN", "CASE", "CHECK",
    "COLUMN", "CONSTRAINT", "CREATE", "DATABASE", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP",
    "EXEC", "EXISTS", "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IN", "INDEX", "INNER",
    "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OR", "ORDER",
    "OUTER", "PRIMARY", "PROCEDURE", "RIGHT", "ROWNUM", "SELECT", "SET", "TABLE", "TOP",
    "TRUNCATE", "UNION", "UNIQUE", "UPDATE", "VALUES", "VIEW", "WHERE", "WITH",
];

/// Field and table validation errors.
///
/// Every field-level variant carries the offending field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Table name is empty or not a plain identifier.
    #[error("invalid table name '{0}': must be alphanumeric or underscore and start with a letter")]
    InvalidTableName(String),
    /// Field name is empty.
    #[error("field name cannot be empty")]
    EmptyFieldName,
    /// Field name contains something other than letters and digits.
    #[error("field name '{0}' contains invalid characters")]
    InvalidFieldName(String),
    /// Field name does not start with a letter.
    #[error("field name '{0}' must start with a letter")]
    FieldNameStart(String),
    /// Field name is a reserved SQL keyword.
    #[error("field name '{0}' is a reserved SQL keyword")]
    ReservedKeyword(String),
    /// Two fields in the same table share a name.
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),
    /// Declared length violates the type's length policy.
    #[error("field '{field}': {field_type} {requirement}, got {length}")]
    InvalidLength {
        field: String,
        field_type: FieldType,
        requirement: &'static str,
        length: u32,
    },
    /// `ENUM`/`SET` without literal values.
    #[error("field '{0}' of type ENUM/SET must define its values")]
    MissingLiterals(String),
    /// Literal values on a type that does not take them.
    #[error("field '{0}' defines values but is not of type ENUM/SET")]
    UnexpectedLiterals(String),
    /// Auto-increment on a field that is not the primary key.
    #[error("field '{0}' is AUTO_INCREMENT but not PRIMARY KEY")]
    AutoIncrementNotPrimary(String),
    /// Auto-increment on a non-integer type.
    #[error("field '{0}' is AUTO_INCREMENT but not of integer type")]
    AutoIncrementNotInteger(String),
    /// Primary key declared nullable.
    #[error("field '{0}' is PRIMARY KEY but marked as nullable")]
    NullablePrimaryKey(String),
    /// Primary key declared with a default value.
    #[error("field '{0}' is PRIMARY KEY but has a default value")]
    PrimaryKeyDefault(String),
    /// Primary key of a type other than integer or string.
    #[error("field '{field}' is PRIMARY KEY but of type {field_type}; only integer and string types are allowed")]
    PrimaryKeyType { field: String, field_type: FieldType },
    /// Primary and unique flags set together.
    #[error("field '{0}' cannot be both PRIMARY KEY and UNIQUE")]
    PrimaryAndUnique(String),
    /// Regular or unique index on a TEXT/BLOB column.
    #[error("field '{0}' cannot use INDEX/UNIQUE on TEXT/BLOB types")]
    IndexOnLargeObject(String),
    /// FULLTEXT index on a non-character column.
    #[error("field '{0}' can only be FULLTEXT indexed if it is a character or text type")]
    FulltextType(String),
    /// SPATIAL index on a non-spatial or nullable column.
    #[error("field '{0}' can only be SPATIAL indexed if it is a non-nullable spatial type")]
    SpatialType(String),
    /// Default value cannot be stored in the column type.
    #[error("field '{field}': default value '{value}' is not compatible with type {field_type}")]
    IncompatibleDefault {
        field: String,
        value: String,
        field_type: FieldType,
    },
    /// More than one primary-key field in a table.
    #[error("table '{0}' has more than one PRIMARY KEY field")]
    MultiplePrimaryKeys(String),
    /// Foreign key derived from a field that is not a registered primary key.
    #[error("field '{0}' must be the PRIMARY KEY of a registered table to derive a foreign key")]
    ForeignKeySource(String),
}

/// Returns `true` for a non-empty identifier of ASCII letters, digits and
/// underscores that starts with a letter.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyFieldName);
    }
    if !name.chars().all(char::is_alphanumeric) {
        return Err(ValidationError::InvalidFieldName(name.to_string()));
    }
    if !name.chars().next().is_some_and(char::is_alphabetic) {
        return Err(ValidationError::FieldNameStart(name.to_string()));
    }
    let upper = name.to_uppercase();
    if SQL_KEYWORDS.contains(&upper.as_str()) {
        return Err(ValidationError::ReservedKeyword(name.to_string()));
    }
    Ok(())
}

/// Length policy of a type: `(minimum, maximum, description)`.
fn length_policy(ty: FieldType) -> Option<(u32, u32, &'static str)> {
    let policy = match ty {
        FieldType::TinyInt => (3, u32::MAX, "length must be at least 3"),
        FieldType::SmallInt => (5, u32::MAX, "length must be at least 5"),
        FieldType::MediumInt => (6, u32::MAX, "length must be at least 6"),
        FieldType::Int | FieldType::BigInt => (1, u32::MAX, "must have a positive length"),
        FieldType::String | FieldType::VarChar | FieldType::Char => {
            (1, u32::MAX, "must have a positive length")
        }
        FieldType::Decimal => (1, 65, "precision must be between 1 and 65"),
        FieldType::Bool => (0, 1, "length must be 0 or 1"),
        ty if ty.is_text()
            || ty.is_blob()
            || ty.is_spatial()
            || ty.has_literals()
            || matches!(
                ty,
                FieldType::Json
                    | FieldType::Date
                    | FieldType::Time
                    | FieldType::DateTime
                    | FieldType::Timestamp
                    | FieldType::Uuid
            ) =>
        {
            (0, 0, "must not have a length")
        }
        _ => return None,
    };
    Some(policy)
}

/// Validates one field in isolation.
///
/// Checks run in a fixed order and the first failure is returned: name,
/// length policy, literal list, auto-increment, primary-key constraints,
/// index flag conflicts, default value compatibility.
pub fn validate_field(field: &FieldSpec) -> Result<(), ValidationError> {
    let name = field.name.as_str();
    let ty = field.field_type;
    check_name(name)?;

    if let Some((min, max, requirement)) = length_policy(ty) {
        if field.length < min || field.length > max {
            return Err(ValidationError::InvalidLength {
                field: name.to_string(),
                field_type: ty,
                requirement,
                length: field.length,
            });
        }
    }

    if ty.has_literals() && field.values.is_empty() {
        return Err(ValidationError::MissingLiterals(name.to_string()));
    }
    if !ty.has_literals() && !field.values.is_empty() {
        return Err(ValidationError::UnexpectedLiterals(name.to_string()));
    }

    if field.auto_increment {
        if !field.index.primary {
            return Err(ValidationError::AutoIncrementNotPrimary(name.to_string()));
        }
        if !ty.is_integer() {
            return Err(ValidationError::AutoIncrementNotInteger(name.to_string()));
        }
    }

    if field.index.primary {
        if field.nullable {
            return Err(ValidationError::NullablePrimaryKey(name.to_string()));
        }
        if field.default.is_some() {
            return Err(ValidationError::PrimaryKeyDefault(name.to_string()));
        }
        if !ty.is_integer() && !ty.is_string() {
            return Err(ValidationError::PrimaryKeyType {
                field: name.to_string(),
                field_type: ty,
            });
        }
        if field.index.unique {
            return Err(ValidationError::PrimaryAndUnique(name.to_string()));
        }
    }

    if (field.index.unique || field.index.indexed) && (ty.is_text() || ty.is_blob()) {
        return Err(ValidationError::IndexOnLargeObject(name.to_string()));
    }
    if field.index.fulltext && !(ty.is_string() || ty.is_text()) {
        return Err(ValidationError::FulltextType(name.to_string()));
    }
    if field.index.spatial && (!ty.is_spatial() || field.nullable) {
        return Err(ValidationError::SpatialType(name.to_string()));
    }

    if let Some(value) = &field.default {
        let fits = if ty.has_literals() {
            value
                .split(',')
                .all(|part| field.values.iter().any(|v| v == part))
        } else {
            ty.is_value_compatible(value)
        };
        if !fits {
            return Err(ValidationError::IncompatibleDefault {
                field: name.to_string(),
                value: value.clone(),
                field_type: ty,
            });
        }
    }

    Ok(())
}

/// Validates a table declaration.
///
/// The table name and field-name uniqueness are checked first, then every
/// field is validated on its own rayon task. All tasks are joined before
/// the primary-key cardinality check.
///
/// # Examples
///
/// ```
/// use modelsync_core::*;
///
/// let fields = vec![
///     FieldSpec::new("id", FieldType::Int).length(11).primary(),
///     FieldSpec::new("code", FieldType::VarChar).length(8).primary(),
/// ];
/// assert_eq!(
///     validate_table("items", &fields),
///     Err(ValidationError::MultiplePrimaryKeys("items".to_string()))
/// );
/// ```
pub fn validate_table(table: &str, fields: &[FieldSpec]) -> Result<(), ValidationError> {
    if !is_valid_identifier(table) {
        return Err(ValidationError::InvalidTableName(table.to_string()));
    }

    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(ValidationError::DuplicateField(field.name.clone()));
        }
    }

    let outcomes: Vec<Result<(), ValidationError>> =
        fields.par_iter().map(validate_field).collect();
    if let Some(err) = outcomes.into_iter().find_map(Result::err) {
        return Err(err);
    }

    if fields.iter().filter(|f| f.index.primary).count() > 1 {
        return Err(ValidationError::MultiplePrimaryKeys(table.to_string()));
    }

    Ok(())
}
