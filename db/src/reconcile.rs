//! Drift detection and DDL reconciliation for one table.
//!
//! [`plan`] compares a [`TableModel`] against its live [`ColumnSnapshot`]s
//! and returns the ordered list of [`Action`]s that would bring the table in
//! line with the model:
//!
//! 1. for each declared column, in declaration order, a `MODIFY COLUMN` when
//!    type, length, default, nullability or auto-increment drifted, then
//!    unique, primary-key and regular-index additions or removals;
//! 2. `DROP COLUMN` for every live column the model no longer declares;
//! 3. `ADD COLUMN` for every declared column missing from the table.
//!
//! [`apply`] executes a plan one statement at a time, asking a [`Confirm`]
//! strategy first unless running in [`ApplyMode::Automatic`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use modelsync_core::{
    FieldSpec, FieldType, TableModel, add_column_sql, add_index_sql, add_primary_key_sql,
    add_unique_sql, column_type, compare, drop_column_sql, drop_index_sql, drop_primary_key_sql,
    index_name, modify_column_sql, parse_live_type, unique_name,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::database::Database;
use crate::error::{Result, SyncError};
use crate::introspect::ColumnSnapshot;

/// Whether DDL actions are confirmed by an operator or applied directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    #[default]
    Interactive,
    Automatic,
}

/// Decides whether a proposed action may run.
pub trait Confirm {
    fn confirm(&mut self, description: &str) -> bool;
}

/// Accepts every action. Used for automatic mode and dry runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl Confirm for AutoApprove {
    fn confirm(&mut self, _description: &str) -> bool {
        true
    }
}

/// Kind of DDL action proposed by [`plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddColumn,
    ModifyColumn,
    DropColumn,
    AddPrimaryKey,
    DropPrimaryKey,
    AddUnique,
    DropUnique,
    AddIndex,
    DropIndex,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::AddColumn => "add column",
            ActionKind::ModifyColumn => "modify column",
            ActionKind::DropColumn => "drop column",
            ActionKind::AddPrimaryKey => "add primary key",
            ActionKind::DropPrimaryKey => "drop primary key",
            ActionKind::AddUnique => "add unique index",
            ActionKind::DropUnique => "drop unique index",
            ActionKind::AddIndex => "add index",
            ActionKind::DropIndex => "drop index",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One proposed DDL statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub table: String,
    pub column: String,
    /// Why a `MODIFY COLUMN` was proposed; empty for other kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    pub sql: String,
}

impl Action {
    fn new(kind: ActionKind, table: &str, column: &str, sql: String) -> Self {
        Self {
            kind,
            table: table.to_string(),
            column: column.to_string(),
            reasons: Vec::new(),
            sql,
        }
    }

    /// One-line description shown to an operator before confirming.
    pub fn describe(&self) -> String {
        if self.reasons.is_empty() {
            format!("{} `{}`.`{}`", self.kind, self.table, self.column)
        } else {
            format!(
                "{} `{}`.`{}` ({})",
                self.kind,
                self.table,
                self.column,
                self.reasons.join("; ")
            )
        }
    }
}

/// Outcome of an [`apply`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub applied: Vec<Action>,
    pub skipped: Vec<Action>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.applied.is_empty() && self.skipped.is_empty()
    }
}

/// Computes the ordered action list that reconciles `live` with `model`.
///
/// An empty result means the table matches the model.
pub fn plan(model: &TableModel, live: &[ColumnSnapshot]) -> Vec<Action> {
    let table = model.name();
    let by_name: HashMap<&str, &ColumnSnapshot> =
        live.iter().map(|c| (c.field.as_str(), c)).collect();

    let mut actions = Vec::new();
    let mut additions = Vec::new();

    for field in model.fields() {
        let Some(column) = by_name.get(field.name.as_str()) else {
            additions.push(Action::new(
                ActionKind::AddColumn,
                table,
                &field.name,
                add_column_sql(table, field),
            ));
            continue;
        };

        let reasons = column_drift(field, column);
        if !reasons.is_empty() {
            let mut action = Action::new(
                ActionKind::ModifyColumn,
                table,
                &field.name,
                modify_column_sql(table, field),
            );
            action.reasons = reasons;
            actions.push(action);
        }

        actions.extend(index_drift(table, field, column));
    }

    let declared: HashSet<&str> = model.fields().iter().map(|f| f.name.as_str()).collect();
    for column in live {
        if !declared.contains(column.field.as_str()) {
            actions.push(Action::new(
                ActionKind::DropColumn,
                table,
                &column.field,
                drop_column_sql(table, &column.field),
            ));
        }
    }

    actions.extend(additions);
    actions
}

/// Lists every column-definition property that differs from the live column.
fn column_drift(field: &FieldSpec, column: &ColumnSnapshot) -> Vec<String> {
    let mut reasons = Vec::new();

    if !compare(field, &column.column_type) {
        reasons.push(format!(
            "type {} != {}",
            column.column_type,
            column_type(field)
        ));
    }

    let (_, live_length) = parse_live_type(&column.column_type);
    let declared_length = match field.field_type.implicit_length() {
        Some(implicit) if field.length == 0 => implicit,
        _ => field.length,
    };
    if length_differs(field.field_type, declared_length, live_length) {
        reasons.push(format!("length {live_length} != {declared_length}"));
    }

    if field.field_type != FieldType::Timestamp
        && normalise_default(field.field_type, column.default.as_deref())
            != normalise_default(field.field_type, field.default.as_deref())
    {
        reasons.push(format!(
            "default {} != {}",
            column.default.as_deref().unwrap_or("NULL"),
            field.default.as_deref().unwrap_or("NULL")
        ));
    }

    if column.is_nullable() != field.nullable {
        reasons.push(format!(
            "nullable {} != {}",
            column.is_nullable(),
            field.nullable
        ));
    }

    if column.is_auto_increment() != field.auto_increment {
        reasons.push(format!(
            "auto_increment {} != {}",
            column.is_auto_increment(),
            field.auto_increment
        ));
    }

    reasons
}

/// Live length 1 against declared 0 is `TINYINT(1)` standing in for a
/// boolean. Integer columns without a reported width come from servers that
/// no longer expose display widths.
fn length_differs(field_type: FieldType, declared: u32, live: u32) -> bool {
    if declared == live {
        return false;
    }
    if live == 1 && declared == 0 {
        return false;
    }
    if live == 0 && field_type.is_integer() {
        return false;
    }
    !field_type.has_literals()
}

/// Brings a default into one textual form per type: boolean tokens become
/// `1`/`0` and numbers lose padding, so `3.50` equals `3.5`.
fn normalise_default(field_type: FieldType, value: Option<&str>) -> Option<String> {
    let value = value?;
    let token = match field_type {
        FieldType::Bool => match value.to_ascii_lowercase().as_str() {
            "true" => "1".to_string(),
            "false" => "0".to_string(),
            other => other.to_string(),
        },
        ty if ty.is_integer() => value
            .trim()
            .parse::<i64>()
            .map_or_else(|_| value.to_string(), |n| n.to_string()),
        ty if ty.is_numeric() => value
            .trim()
            .parse::<f64>()
            .map_or_else(|_| value.to_string(), |n| n.to_string()),
        _ => value.to_string(),
    };
    Some(token)
}

fn index_drift(table: &str, field: &FieldSpec, column: &ColumnSnapshot) -> Vec<Action> {
    let name = field.name.as_str();
    let mut actions = Vec::new();

    if field.index.unique != column.is_unique {
        actions.push(if field.index.unique {
            Action::new(ActionKind::AddUnique, table, name, add_unique_sql(table, name))
        } else {
            Action::new(
                ActionKind::DropUnique,
                table,
                name,
                drop_index_sql(table, &unique_name(name)),
            )
        });
    }

    if field.index.primary != column.is_primary {
        actions.push(if field.index.primary {
            Action::new(
                ActionKind::AddPrimaryKey,
                table,
                name,
                add_primary_key_sql(table, name),
            )
        } else {
            Action::new(
                ActionKind::DropPrimaryKey,
                table,
                name,
                drop_primary_key_sql(table),
            )
        });
    }

    if field.index.indexed != column.is_indexed {
        actions.push(if field.index.indexed {
            Action::new(ActionKind::AddIndex, table, name, add_index_sql(table, name))
        } else {
            Action::new(
                ActionKind::DropIndex,
                table,
                name,
                drop_index_sql(table, &index_name(name)),
            )
        });
    }

    actions
}

/// Executes `actions` in order.
///
/// In [`ApplyMode::Interactive`] each action is offered to `confirm`; a
/// declined action is skipped and the pass continues. The database is pinged
/// before every statement.
///
/// # Errors
///
/// Stops at the first failing statement and returns
/// [`SyncError::Execution`] naming the table, column and action, or
/// [`SyncError::Connectivity`] if the database stopped answering.
pub fn apply(
    db: &dyn Database,
    actions: Vec<Action>,
    mode: ApplyMode,
    confirm: &mut dyn Confirm,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for action in actions {
        let description = action.describe();
        if mode == ApplyMode::Interactive && !confirm.confirm(&description) {
            info!(table = %action.table, column = %action.column, action = %action.kind, "skipped");
            report.skipped.push(action);
            continue;
        }

        db.ping().map_err(|source| SyncError::Connectivity {
            attempts: 1,
            source,
        })?;

        if let Err(source) = db.exec(&action.sql, &[]) {
            warn!(
                table = %action.table,
                column = %action.column,
                action = %action.kind,
                sql = %action.sql,
                error = %source,
                "statement failed"
            );
            return Err(SyncError::Execution {
                table: action.table,
                column: action.column,
                action: action.kind.to_string(),
                sql: action.sql,
                source,
            });
        }

        info!(table = %action.table, column = %action.column, action = %action.kind, sql = %action.sql, "applied");
        report.applied.push(action);
    }

    Ok(report)
}

/// Plans and applies in one step.
pub fn reconcile(
    db: &dyn Database,
    model: &TableModel,
    live: &[ColumnSnapshot],
    mode: ApplyMode,
    confirm: &mut dyn Confirm,
) -> Result<ReconcileReport> {
    apply(db, plan(model, live), mode, confirm)
}
