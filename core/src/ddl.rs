//! MySQL DDL rendering for declared fields and tables.
//!
//! Index names follow a fixed prefix convention that the schema
//! introspector relies on when classifying live indexes:
//!
//! | Index      | Name           |
//! |------------|----------------|
//! | regular    | `idx_<field>`  |
//! | unique     | `unq_<field>`  |
//! | fulltext   | `ftxt_<field>` |
//! | spatial    | `sp_<field>`   |
//! | foreign key| `fk_<field>`   |
//!
//! Primary keys are unnamed and reported by MySQL as `PRIMARY`.

use crate::typemap::{TIMESTAMP_EXPRESSIONS, column_type};
use crate::types::{FieldSpec, FieldType, TableModel};

/// Prefix of regular index names.
pub const INDEX_PREFIX: &str = "idx";
/// Prefix of unique index names.
pub const UNIQUE_PREFIX: &str = "unq";

/// Quotes an identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn index_name(field: &str) -> String {
    format!("{INDEX_PREFIX}_{field}")
}

pub fn unique_name(field: &str) -> String {
    format!("{UNIQUE_PREFIX}_{field}")
}

/// Renders the `DEFAULT` operand for a field's declared default value.
///
/// Returns `None` when the field has no default.
pub fn default_literal(field: &FieldSpec) -> Option<String> {
    let value = field.default.as_deref()?;
    let ty = field.field_type;
    let rendered = match ty {
        FieldType::Bool => {
            if matches!(value, "true" | "1") {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        FieldType::Json => format!("({})", quote_literal(value)),
        FieldType::DateTime | FieldType::Timestamp if TIMESTAMP_EXPRESSIONS.contains(&value) => {
            value.to_string()
        }
        _ if ty.is_numeric() => value.to_string(),
        _ => quote_literal(value),
    };
    Some(rendered)
}

/// Renders a column definition as used by `CREATE TABLE`, `ADD COLUMN`
/// and `MODIFY COLUMN`.
///
/// # Examples
///
/// ```
/// use modelsync_core::{FieldSpec, FieldType, column_definition};
///
/// let id = FieldSpec::new("id", FieldType::Int).length(11).primary().auto_increment();
/// assert_eq!(column_definition(&id), "`id` INT(11) NOT NULL AUTO_INCREMENT");
///
/// let nick = FieldSpec::new("nick", FieldType::VarChar).length(20).nullable().default_value("anon");
/// assert_eq!(column_definition(&nick), "`nick` VARCHAR(20) NULL DEFAULT 'anon'");
/// ```
pub fn column_definition(field: &FieldSpec) -> String {
    let mut parts = vec![quote_ident(&field.name), column_type(field)];
    parts.push(if field.nullable { "NULL" } else { "NOT NULL" }.to_string());
    if let Some(default) = default_literal(field) {
        parts.push(format!("DEFAULT {default}"));
    }
    if field.auto_increment {
        parts.push("AUTO_INCREMENT".to_string());
    }
    parts.join(" ")
}

fn foreign_key_clause(field: &FieldSpec) -> Option<String> {
    let fk = field.foreign_key.as_ref()?;
    let mut clause = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
        quote_ident(&format!("fk_{}", field.name)),
        quote_ident(&field.name),
        quote_ident(&fk.table),
        quote_ident(&fk.column)
    );
    if let Some(action) = &fk.on_delete {
        clause.push_str(&format!(" ON DELETE {action}"));
    }
    if let Some(action) = &fk.on_update {
        clause.push_str(&format!(" ON UPDATE {action}"));
    }
    Some(clause)
}

/// Index and constraint clauses declared by a field, in a stable order:
/// primary, regular, fulltext, spatial, unique, foreign key.
pub fn index_clauses(field: &FieldSpec) -> Vec<String> {
    let column = quote_ident(&field.name);
    let mut clauses = Vec::new();
    if field.index.primary {
        clauses.push(format!("PRIMARY KEY ({column})"));
    }
    if field.index.indexed {
        clauses.push(format!("INDEX {} ({column})", quote_ident(&index_name(&field.name))));
    }
    if field.index.fulltext {
        clauses.push(format!(
            "FULLTEXT {} ({column})",
            quote_ident(&format!("ftxt_{}", field.name))
        ));
    }
    if field.index.spatial {
        clauses.push(format!(
            "SPATIAL {} ({column})",
            quote_ident(&format!("sp_{}", field.name))
        ));
    }
    if field.index.unique {
        clauses.push(format!("UNIQUE {} ({column})", quote_ident(&unique_name(&field.name))));
    }
    clauses.extend(foreign_key_clause(field));
    clauses
}

/// Renders `CREATE TABLE IF NOT EXISTS` for a whole model.
///
/// Column definitions come first in declaration order, followed by every
/// field's index and constraint clauses.
pub fn create_table_sql(model: &TableModel) -> String {
    let mut lines: Vec<String> = model
        .fields()
        .iter()
        .map(|f| format!("    {}", column_definition(f)))
        .collect();
    lines.extend(
        model
            .fields()
            .iter()
            .flat_map(index_clauses)
            .map(|clause| format!("    {clause}")),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        quote_ident(model.name()),
        lines.join(",\n")
    )
}

/// Renders `ALTER TABLE ... ADD COLUMN` together with the field's indexes.
pub fn add_column_sql(table: &str, field: &FieldSpec) -> String {
    let mut clauses = vec![format!("ADD COLUMN {}", column_definition(field))];
    clauses.extend(index_clauses(field).into_iter().map(|c| format!("ADD {c}")));
    format!("ALTER TABLE {} {};", quote_ident(table), clauses.join(", "))
}

pub fn modify_column_sql(table: &str, field: &FieldSpec) -> String {
    format!(
        "ALTER TABLE {} MODIFY COLUMN {};",
        quote_ident(table),
        column_definition(field)
    )
}

pub fn drop_column_sql(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {};", quote_ident(table), quote_ident(column))
}

pub fn add_primary_key_sql(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} ADD PRIMARY KEY ({});", quote_ident(table), quote_ident(column))
}

pub fn drop_primary_key_sql(table: &str) -> String {
    format!("ALTER TABLE {} DROP PRIMARY KEY;", quote_ident(table))
}

pub fn add_unique_sql(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} ADD UNIQUE {} ({});",
        quote_ident(table),
        quote_ident(&unique_name(column)),
        quote_ident(column)
    )
}

pub fn add_index_sql(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} ADD INDEX {} ({});",
        quote_ident(table),
        quote_ident(&index_name(column)),
        quote_ident(column)
    )
}

/// Renders `DROP INDEX` for a named index.
pub fn drop_index_sql(table: &str, index: &str) -> String {
    format!("ALTER TABLE {} DROP INDEX {};", quote_ident(table), quote_ident(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForeignKey;

    fn users() -> TableModel {
        TableModel::new(
            "users",
            vec![
                FieldSpec::new("id", FieldType::Int).length(11).primary().auto_increment(),
                FieldSpec::new("email", FieldType::VarChar).length(120).unique(),
                FieldSpec::new("active", FieldType::Bool).default_value("true"),
                FieldSpec::new("role", FieldType::Int)
                    .length(11)
                    .indexed()
                    .references(ForeignKey {
                        table: "roles".into(),
                        column: "id".into(),
                        on_delete: Some("CASCADE".into()),
                        on_update: None,
                    }),
            ],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_create_table_sql_lists_columns_then_indexes() {
        let sql = create_table_sql(&users());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `users` (\n"));
        let columns = sql.find("`active` BOOLEAN NOT NULL DEFAULT TRUE").unwrap();
        let primary = sql.find("PRIMARY KEY (`id`)").unwrap();
        assert!(columns < primary);
        assert!(sql.contains("UNIQUE `unq_email` (`email`)"));
        assert!(sql.contains("INDEX `idx_role` (`role`)"));
        assert!(sql.contains(
            "CONSTRAINT `fk_role` FOREIGN KEY (`role`) REFERENCES `roles`(`id`) ON DELETE CASCADE"
        ));
        assert!(sql.ends_with("\n);"));
    }

    #[test]
    fn test_default_literal_rendering() {
        let ts = FieldSpec::new("at", FieldType::Timestamp).default_value("CURRENT_TIMESTAMP");
        assert_eq!(default_literal(&ts).as_deref(), Some("CURRENT_TIMESTAMP"));

        let day = FieldSpec::new("day", FieldType::Date).default_value("2024-01-01");
        assert_eq!(default_literal(&day).as_deref(), Some("'2024-01-01'"));

        let meta = FieldSpec::new("meta", FieldType::Json).default_value("{}");
        assert_eq!(default_literal(&meta).as_deref(), Some("('{}')"));

        let quote = FieldSpec::new("q", FieldType::VarChar).length(5).default_value("it's");
        assert_eq!(default_literal(&quote).as_deref(), Some("'it''s'"));

        let off = FieldSpec::new("flag", FieldType::Bool).default_value("0");
        assert_eq!(default_literal(&off).as_deref(), Some("FALSE"));
    }

    #[test]
    fn test_bool_with_length_renders_valid_column() {
        let flag = FieldSpec::new("flag", FieldType::Bool).length(1);
        assert_eq!(column_definition(&flag), "`flag` BOOLEAN NOT NULL");
    }

    #[test]
    fn test_alter_statements() {
        let users = users();
        let email = users.field("email").unwrap();
        assert_eq!(
            add_column_sql("users", email),
            "ALTER TABLE `users` ADD COLUMN `email` VARCHAR(120) NOT NULL, ADD UNIQUE `unq_email` (`email`);"
        );
        assert_eq!(
            modify_column_sql("users", email),
            "ALTER TABLE `users` MODIFY COLUMN `email` VARCHAR(120) NOT NULL;"
        );
        assert_eq!(drop_column_sql("users", "legacy"), "ALTER TABLE `users` DROP COLUMN `legacy`;");
        assert_eq!(drop_primary_key_sql("users"), "ALTER TABLE `users` DROP PRIMARY KEY;");
        assert_eq!(
            add_index_sql("users", "role"),
            "ALTER TABLE `users` ADD INDEX `idx_role` (`role`);"
        );
        assert_eq!(
            drop_index_sql("users", "unq_email"),
            "ALTER TABLE `users` DROP INDEX `unq_email`;"
        );
    }
}
