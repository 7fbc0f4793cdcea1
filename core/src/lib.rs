//! Declarative column model for schema-synchronised MySQL tables.
//!
//! This crate holds the pure, database-independent half of the system:
//!
//! - [`FieldSpec`] / [`TableModel`] — declared columns and tables, with
//!   index flags and optional foreign keys.
//! - Type mapping ([`FieldType::sql_type`], [`column_type`], [`compare`],
//!   [`parse_live_type`]) between semantic types and MySQL column types.
//! - DDL rendering ([`column_definition`], [`create_table_sql`] and the
//!   `ALTER TABLE` builders) using the `idx_`/`unq_` index naming
//!   convention.
//! - Validation ([`validate_field`], [`validate_table`]) of declarations
//!   before any DDL is generated.
//!
//! # Example
//!
//! ```
//! use modelsync_core::*;
//!
//! let users = TableModel::new(
//!     "users",
//!     vec![
//!         FieldSpec::new("id", FieldType::Int).length(11).primary().auto_increment(),
//!         FieldSpec::new("email", FieldType::VarChar).length(120).unique(),
//!         FieldSpec::new("active", FieldType::Bool).default_value("true"),
//!     ],
//!     vec![],
//! )
//! .unwrap();
//!
//! let sql = create_table_sql(&users);
//! assert!(sql.contains("`email` VARCHAR(120) NOT NULL"));
//! assert!(sql.contains("UNIQUE `unq_email` (`email`)"));
//! assert!(compare(users.field("active").unwrap(), "tinyint(1)"));
//! ```

mod ddl;
mod typemap;
mod types;
mod validate;

pub use ddl::*;
pub use typemap::{TIMESTAMP_EXPRESSIONS, column_type, compare, parse_live_type};
pub use types::{FieldSpec, FieldType, ForeignKey, IndexFlags, TableModel, UnknownFieldType};
pub use validate::{ValidationError, is_valid_identifier, validate_field, validate_table};
