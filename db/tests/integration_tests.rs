use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;

use modelsync_core::{FieldSpec, FieldType, TableModel};
use modelsync_db::{
    ActionKind, ComponentCache, ComponentOutcome, ComponentStore, Confirm, Database, DriverError,
    ModelRegistry, PrimaryKey, Prompt, Record, RetryPolicy, Row, SchemaOutcome, SyncConfig,
    SyncError, Synchronizer,
};
use serde_json::{Value, json};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A MySQL catalog answering the introspection queries from fixed columns.
///
/// Each column is `(name, type, null, key, default, extra, index names)`.
#[derive(Default)]
struct Catalog {
    tables: HashMap<String, Vec<CatalogColumn>>,
    executed: RefCell<Vec<String>>,
}

impl Catalog {
    fn table(mut self, name: &str, columns: Vec<CatalogColumn>) -> Self {
        self.tables.insert(name.to_string(), columns);
        self
    }

    fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }
}

type CatalogColumn = (Vec<Value>, Vec<&'static str>);

fn column(name: &str, column_type: &str, key: &str, indexes: Vec<&'static str>) -> CatalogColumn {
    (
        vec![
            json!(name),
            json!(column_type),
            json!("NO"),
            json!(key),
            Value::Null,
            json!(""),
        ],
        indexes,
    )
}

impl Database for Catalog {
    fn ping(&self) -> Result<(), DriverError> {
        Ok(())
    }

    fn query_row(&self, sql: &str, args: &[Value]) -> Result<Option<Row>, DriverError> {
        Ok(self.query(sql, args)?.into_iter().next())
    }

    fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DriverError> {
        if sql.contains("information_schema.tables") {
            let table = args[0].as_str().unwrap_or_default();
            let count = i64::from(self.tables.contains_key(table));
            return Ok(vec![Row::new(vec![json!(count)])]);
        }
        if sql == "SELECT DATABASE()" {
            return Ok(vec![Row::new(vec![json!("app")])]);
        }
        if let Some(table) = sql.strip_prefix("SHOW COLUMNS FROM ") {
            let table = table.trim_matches('`');
            let columns = self.tables.get(table).cloned().unwrap_or_default();
            return Ok(columns.into_iter().map(|(row, _)| Row::new(row)).collect());
        }
        if sql.contains("information_schema.statistics") {
            let table = args[1].as_str().unwrap_or_default();
            let name = args[2].as_str().unwrap_or_default();
            let indexes = self
                .tables
                .get(table)
                .and_then(|cols| cols.iter().find(|(row, _)| row[0] == json!(name)))
                .map(|(_, indexes)| indexes.clone())
                .unwrap_or_default();
            return Ok(indexes
                .into_iter()
                .map(|index| Row::new(vec![json!(name), json!(index), json!(1)]))
                .collect());
        }
        Err(DriverError::new(format!("unexpected query: {sql}")))
    }

    fn exec(&self, sql: &str, _args: &[Value]) -> Result<u64, DriverError> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(0)
    }
}

/// Component rows keyed by an integer `id` column.
#[derive(Default)]
struct Rows(RefCell<HashMap<String, Vec<Record>>>);

impl Rows {
    fn seed(self, table: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|row| row.as_object().cloned())
            .collect();
        self.0.borrow_mut().insert(table.to_string(), rows);
        self
    }

    fn ids(&self, table: &str) -> Vec<Value> {
        let mut ids: Vec<Value> = self
            .0
            .borrow()
            .get(table)
            .map(|rows| rows.iter().map(|row| row["id"].clone()).collect())
            .unwrap_or_default();
        ids.sort_by_key(|id| id.as_i64());
        ids
    }
}

impl ComponentStore for Rows {
    fn fetch_all(&self, table: &str) -> Result<Vec<Record>, DriverError> {
        Ok(self.0.borrow().get(table).cloned().unwrap_or_default())
    }

    fn insert(&self, table: &str, record: &Record) -> Result<(), DriverError> {
        self.0
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn delete_where(&self, table: &str, column: &str, key: &PrimaryKey) -> Result<(), DriverError> {
        let target = key.to_value();
        if let Some(rows) = self.0.borrow_mut().get_mut(table) {
            rows.retain(|row| row.get(column) != Some(&target));
        }
        Ok(())
    }

    fn update_field(
        &self,
        table: &str,
        key_column: &str,
        key: &PrimaryKey,
        column: &str,
        value: &Value,
    ) -> Result<(), DriverError> {
        let target = key.to_value();
        let mut tables = self.0.borrow_mut();
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row.get(key_column) == Some(&target)))
            .ok_or_else(|| DriverError::new("no such row"))?;
        row.insert(column.to_string(), value.clone());
        Ok(())
    }
}

/// Declines every action whose description starts with one of `declined`
/// and answers every prompt with `answer`.
struct Operator {
    declined: Vec<&'static str>,
    answer: &'static str,
}

impl Operator {
    fn new(declined: Vec<&'static str>, answer: &'static str) -> Self {
        Self { declined, answer }
    }
}

impl Confirm for Operator {
    fn confirm(&mut self, description: &str) -> bool {
        !self.declined.iter().any(|prefix| description.starts_with(prefix))
    }
}

impl Prompt for Operator {
    fn ask(&mut self, _question: &str) -> Option<String> {
        Some(self.answer.to_string())
    }
}

fn roles() -> TableModel {
    TableModel::new(
        "roles",
        vec![
            FieldSpec::new("id", FieldType::Int).length(11).primary(),
            FieldSpec::new("label", FieldType::VarChar).length(20),
        ],
        vec![],
    )
    .unwrap()
}

fn users() -> TableModel {
    TableModel::new(
        "users",
        vec![
            FieldSpec::new("id", FieldType::Int)
                .length(11)
                .primary()
                .auto_increment(),
            FieldSpec::new("email", FieldType::VarChar).length(120).unique(),
            FieldSpec::new("role", FieldType::Int).length(11),
        ],
        vec!["roles".to_string()],
    )
    .unwrap()
}

fn drifted_roles() -> Catalog {
    Catalog::default().table(
        "roles",
        vec![
            column("id", "int(11)", "PRI", vec!["PRIMARY"]),
            column("label", "varchar(10)", "", vec![]),
            column("legacy", "tinyint(1)", "", vec![]),
        ],
    )
}

fn config(dir: &TempDir, migrate_schema: bool, migrate_components: bool) -> SyncConfig {
    SyncConfig {
        components_dir: dir.path().to_path_buf(),
        migrate_schema,
        migrate_components,
        retry: RetryPolicy {
            attempts: 1,
            interval_ms: 1,
        },
    }
}

fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.register(users()).unwrap();
    registry.register(roles()).unwrap();
    registry
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_automatic_run_reconciles_creates_and_syncs() {
    let dir = TempDir::new().unwrap();
    fs::write(
        ComponentCache::path_for(dir.path(), "roles"),
        r#"{"1": {"label": "admin"}}"#,
    )
    .unwrap();

    let db = drifted_roles();
    let store = Rows::default().seed("roles", vec![json!({"id": 2, "label": "guest"})]);
    let mut registry = registry();

    let mut sync = Synchronizer::new(&db, &store, config(&dir, true, true), Operator::new(vec![], "y"));
    let reports = sync.run(&mut registry).unwrap();

    let tables: Vec<&str> = reports.iter().map(|r| r.table.as_str()).collect();
    assert_eq!(tables, vec!["roles", "users"]);
    assert!(registry.is_empty());

    match &reports[0].schema {
        SchemaOutcome::Reconciled(report) => {
            let kinds: Vec<ActionKind> = report.applied.iter().map(|a| a.kind).collect();
            assert_eq!(kinds, vec![ActionKind::ModifyColumn, ActionKind::DropColumn]);
            assert!(report.skipped.is_empty());
        }
        other => panic!("unexpected schema outcome: {other:?}"),
    }
    assert!(matches!(reports[1].schema, SchemaOutcome::Created { .. }));

    let executed = db.executed();
    assert_eq!(executed.len(), 3);
    assert!(executed[0].starts_with("ALTER TABLE `roles` MODIFY COLUMN `label` VARCHAR(20)"));
    assert_eq!(executed[1], "ALTER TABLE `roles` DROP COLUMN `legacy`;");
    assert!(executed[2].starts_with("CREATE TABLE IF NOT EXISTS `users`"));

    match &reports[0].components {
        Some(ComponentOutcome::Synced(report)) => {
            assert_eq!(report.inserted, vec!["1"]);
            assert_eq!(report.deleted, vec!["2"]);
        }
        other => panic!("unexpected component outcome: {other:?}"),
    }
    assert_eq!(reports[1].components, None);
    assert_eq!(store.ids("roles"), vec![json!(1)]);

    let cache = sync.component("roles").unwrap();
    assert_eq!(cache.get("1").unwrap()["label"], json!("admin"));
    assert!(sync.component("users").is_none());
}

#[test]
fn test_interactive_run_skips_declined_actions() {
    let dir = TempDir::new().unwrap();
    let db = drifted_roles();
    let store = Rows::default();

    let mut sync = Synchronizer::new(
        &db,
        &store,
        config(&dir, false, false),
        Operator::new(vec!["drop column"], "y"),
    );
    let report = sync.sync_table(&roles()).unwrap();

    match report.schema {
        SchemaOutcome::Reconciled(report) => {
            assert_eq!(report.applied.len(), 1);
            assert_eq!(report.skipped.len(), 1);
            assert_eq!(report.skipped[0].column, "legacy");
        }
        other => panic!("unexpected schema outcome: {other:?}"),
    }
    assert_eq!(db.executed().len(), 1);
}

#[test]
fn test_refresh_pushes_components_into_empty_table() {
    let dir = TempDir::new().unwrap();
    fs::write(
        ComponentCache::path_for(dir.path(), "roles"),
        r#"{"1": {"label": "admin"}, "2": {"label": "guest"}}"#,
    )
    .unwrap();
    let db = Catalog::default();
    let store = Rows::default();

    let mut sync = Synchronizer::new(&db, &store, config(&dir, true, false), Operator::new(vec![], "y"));
    let report = sync.sync_table(&roles()).unwrap();

    assert!(matches!(report.schema, SchemaOutcome::Created { .. }));
    assert!(matches!(report.components, Some(ComponentOutcome::Refreshed(_))));
    assert_eq!(store.ids("roles"), vec![json!(1), json!(2)]);

    let mut values = Record::new();
    values.insert("label".to_string(), json!("owner"));
    sync.component_mut("roles")
        .unwrap()
        .update(&store, "1", values)
        .unwrap();
    assert_eq!(store.fetch_all("roles").unwrap()[0]["label"], json!("owner"));
}

#[test]
fn test_dependency_cycle_stops_before_any_statement() {
    let dir = TempDir::new().unwrap();
    let db = Catalog::default();
    let store = Rows::default();

    let mut registry = ModelRegistry::new();
    registry
        .register(TableModel::new("a", roles().fields().to_vec(), vec!["b".to_string()]).unwrap())
        .unwrap();
    registry
        .register(TableModel::new("b", roles().fields().to_vec(), vec!["a".to_string()]).unwrap())
        .unwrap();

    let mut sync = Synchronizer::new(&db, &store, config(&dir, true, true), Operator::new(vec![], "y"));
    match sync.run(&mut registry) {
        Err(SyncError::DependencyCycle(path)) => {
            assert_eq!(path.first(), path.last());
            assert_eq!(path.len(), 3);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(db.executed().is_empty());
    assert_eq!(registry.len(), 2);
}
