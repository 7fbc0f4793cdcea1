//! JSON-backed component tables kept in step with the database.
//!
//! A component table is static or configuration data that lives in three
//! places: `<dir>/<table>.component.json`, the in-memory [`ComponentSet`]
//! held by a [`ComponentCache`], and the database table itself. The database
//! is authoritative. After [`ComponentCache::sync_with_database`] or
//! [`ComponentCache::refresh_from_database`] the memory set and the file are
//! rebuilt from what the database holds.
//!
//! Row access goes through the [`ComponentStore`] query-builder seam.
//! Integer primary keys are coerced explicitly on both sides: the file
//! always stores keys as strings, while drivers hand integer columns back as
//! numbers.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use modelsync_core::TableModel;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{DriverError, Result, SyncError};
use crate::prompt::Prompt;

/// One component row: column name to value.
pub type Record = Map<String, Value>;

/// Full contents of a component table keyed by primary key text.
pub type ComponentSet = BTreeMap<String, Record>;

/// File name suffix of component caches.
pub const COMPONENT_SUFFIX: &str = ".component.json";

const CONFLICT_QUESTION: &str =
    "is empty in the database but has local components. Push local components to the database? [y/n]";

/// Row-level operations of the query builder used by component sync.
pub trait ComponentStore {
    /// Returns every row of `table`.
    fn fetch_all(&self, table: &str) -> std::result::Result<Vec<Record>, DriverError>;

    fn insert(&self, table: &str, record: &Record) -> std::result::Result<(), DriverError>;

    /// Deletes the rows whose `column` equals `key`.
    fn delete_where(
        &self,
        table: &str,
        column: &str,
        key: &PrimaryKey,
    ) -> std::result::Result<(), DriverError>;

    /// Sets one column of the row whose `key_column` equals `key`.
    fn update_field(
        &self,
        table: &str,
        key_column: &str,
        key: &PrimaryKey,
        column: &str,
        value: &Value,
    ) -> std::result::Result<(), DriverError>;
}

/// Primary-key value after coercion to the column's type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimaryKey {
    Int(i64),
    Text(String),
}

impl PrimaryKey {
    /// Coerces a key from the component file.
    ///
    /// Returns `None` when `integer` is set and `key` is not an integer.
    pub fn from_key(key: &str, integer: bool) -> Option<Self> {
        if integer {
            key.trim().parse().ok().map(PrimaryKey::Int)
        } else {
            Some(PrimaryKey::Text(key.to_string()))
        }
    }

    /// Coerces a primary-key value returned by the database.
    pub fn from_value(value: &Value, integer: bool) -> Option<Self> {
        match value {
            Value::Number(n) if integer => n.as_i64().map(PrimaryKey::Int),
            Value::String(s) if integer => s.trim().parse().ok().map(PrimaryKey::Int),
            Value::Number(n) => Some(PrimaryKey::Text(n.to_string())),
            Value::String(s) => Some(PrimaryKey::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            PrimaryKey::Int(n) => Value::from(*n),
            PrimaryKey::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Int(n) => write!(f, "{n}"),
            PrimaryKey::Text(s) => f.write_str(s),
        }
    }
}

/// A row operation that failed during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentFailure {
    pub key: String,
    pub action: &'static str,
    pub message: String,
}

/// What [`ComponentCache::sync_with_database`] changed in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub inserted: Vec<String>,
    pub deleted: Vec<String>,
    pub failures: Vec<ComponentFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// How [`ComponentCache::refresh_from_database`] resolved local state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Local state was replaced by the database contents.
    Refreshed,
    /// The database was empty and the operator chose to push local state.
    Pushed(SyncReport),
    /// The database was empty and the operator chose to discard local state.
    Discarded,
}

/// In-memory component set of one table plus its cache file.
#[derive(Debug, Clone)]
pub struct ComponentCache {
    table: String,
    primary: String,
    integer_key: bool,
    path: PathBuf,
    records: ComponentSet,
}

impl ComponentCache {
    /// Creates an empty cache for `model` whose file lives in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingPrimaryKey`] if the model declares no
    /// primary key.
    pub fn new(model: &TableModel, dir: impl AsRef<Path>) -> Result<Self> {
        let primary = model
            .primary()
            .ok_or_else(|| SyncError::MissingPrimaryKey(model.name().to_string()))?;
        Ok(Self {
            table: model.name().to_string(),
            primary: primary.name.clone(),
            integer_key: primary.field_type.is_integer(),
            path: Self::path_for(dir, model.name()),
            records: ComponentSet::new(),
        })
    }

    /// Creates the cache and loads its file.
    pub fn open(model: &TableModel, dir: impl AsRef<Path>) -> Result<Self> {
        let mut cache = Self::new(model, dir)?;
        cache.load()?;
        Ok(cache)
    }

    /// `<dir>/<table>.component.json`
    pub fn path_for(dir: impl AsRef<Path>, table: &str) -> PathBuf {
        dir.as_ref().join(format!("{table}{COMPONENT_SUFFIX}"))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &ComponentSet {
        &self.records
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    /// Replaces the in-memory set with the file contents.
    ///
    /// A missing file yields an empty set.
    pub fn load(&mut self) -> Result<()> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(table = %self.table, path = %self.path.display(), "no component file");
                self.records.clear();
                return Ok(());
            }
            Err(source) => {
                return Err(SyncError::ComponentFile {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        self.records =
            serde_json::from_str(&text).map_err(|source| SyncError::ComponentFormat {
                path: self.path.clone(),
                source,
            })?;
        debug!(table = %self.table, count = self.records.len(), "loaded components");
        Ok(())
    }

    /// Rewrites the whole file from the in-memory set.
    pub fn persist(&self) -> Result<()> {
        let file_error = |source: std::io::Error| SyncError::ComponentFile {
            path: self.path.clone(),
            source,
        };
        let json =
            serde_json::to_string_pretty(&self.records).map_err(|source| {
                SyncError::ComponentFormat {
                    path: self.path.clone(),
                    source,
                }
            })?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(file_error)?;
        }
        fs::write(&self.path, json + "\n").map_err(file_error)?;
        Ok(())
    }

    /// Updates the columns in `values` for component `key`, in the database
    /// first and then in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if `key` is not in the in-memory set;
    /// nothing is written in that case.
    pub fn update(&mut self, store: &dyn ComponentStore, key: &str, values: Record) -> Result<()> {
        if !self.records.contains_key(key) {
            return Err(SyncError::NotFound {
                table: self.table.clone(),
                key: key.to_string(),
            });
        }
        let primary_key = self.coerce_local(key)?;

        for (column, value) in &values {
            store
                .update_field(&self.table, &self.primary, &primary_key, column, value)
                .map_err(|source| SyncError::Execution {
                    table: self.table.clone(),
                    column: column.clone(),
                    action: "update".to_string(),
                    sql: format!(
                        "UPDATE `{}` SET `{column}` = ? WHERE `{}` = ?",
                        self.table, self.primary
                    ),
                    source,
                })?;
        }

        if let Some(record) = self.records.get_mut(key) {
            record.extend(values);
        }
        self.persist()
    }

    /// Pushes the in-memory set to the database, then rebuilds memory and the
    /// file from the rows the database holds afterwards.
    ///
    /// Does nothing when the in-memory set is empty. Local components missing
    /// from the database are inserted and database rows missing locally are
    /// deleted. Reloaded rows carry the primary-key column and any column
    /// defaults the database filled in. Individual insert or delete failures are collected in the
    /// report and do not stop the pass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Fetch`] if the rows cannot be read,
    /// [`SyncError::InvalidKey`] if a key does not fit an integer primary
    /// key or two keys coerce to the same value, and file errors from [`persist`](Self::persist).
    pub fn sync_with_database(&mut self, store: &dyn ComponentStore) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        if self.records.is_empty() {
            return Ok(report);
        }

        let mut local = BTreeMap::new();
        for (text, record) in &self.records {
            let key = self.coerce_local(text)?;
            if local.insert(key, record).is_some() {
                return Err(SyncError::InvalidKey {
                    table: self.table.clone(),
                    key: text.clone(),
                });
            }
        }
        let remote = self.fetch(store)?;
        let database_was_empty = remote.is_empty();

        for (key, record) in &local {
            if remote.contains_key(key) {
                continue;
            }
            match store.insert(&self.table, &self.row_for_insert(key, record)) {
                Ok(()) => {
                    info!(table = %self.table, key = %key, "inserted component");
                    report.inserted.push(key.to_string());
                }
                Err(err) => {
                    warn!(table = %self.table, key = %key, error = %err, "component insert failed");
                    report.failures.push(ComponentFailure {
                        key: key.to_string(),
                        action: "insert",
                        message: err.to_string(),
                    });
                }
            }
        }

        if !database_was_empty {
            for key in remote.keys().filter(|key| !local.contains_key(*key)) {
                match store.delete_where(&self.table, &self.primary, key) {
                    Ok(()) => {
                        info!(table = %self.table, key = %key, "deleted component");
                        report.deleted.push(key.to_string());
                    }
                    Err(err) => {
                        warn!(table = %self.table, key = %key, error = %err, "component delete failed");
                        report.failures.push(ComponentFailure {
                            key: key.to_string(),
                            action: "delete",
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        let rows = self.fetch(store)?;
        self.replace(rows)?;
        Ok(report)
    }

    /// Brings memory and the file in line with the database without
    /// writing to it.
    ///
    /// If the database holds rows they replace local state. If it is empty
    /// while local components exist, `prompt` decides: `y` pushes local state
    /// through [`sync_with_database`](Self::sync_with_database), `n` empties
    /// local state, and any other answer is asked again.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Conflict`] if the prompt stops answering before a
    /// decision was made.
    pub fn refresh_from_database(
        &mut self,
        store: &dyn ComponentStore,
        prompt: &mut dyn Prompt,
    ) -> Result<RefreshOutcome> {
        let rows = self.fetch(store)?;
        if !rows.is_empty() || self.records.is_empty() {
            self.replace(rows)?;
            return Ok(RefreshOutcome::Refreshed);
        }

        let question = format!("Table '{}' {CONFLICT_QUESTION}", self.table);
        loop {
            let Some(answer) = prompt.ask(&question) else {
                return Err(SyncError::Conflict(self.table.clone()));
            };
            match answer.trim() {
                "y" => return Ok(RefreshOutcome::Pushed(self.sync_with_database(store)?)),
                "n" => {
                    info!(table = %self.table, "discarding local components");
                    self.replace(BTreeMap::new())?;
                    return Ok(RefreshOutcome::Discarded);
                }
                other => warn!(table = %self.table, answer = other, "expected 'y' or 'n'"),
            }
        }
    }

    fn coerce_local(&self, key: &str) -> Result<PrimaryKey> {
        PrimaryKey::from_key(key, self.integer_key).ok_or_else(|| SyncError::InvalidKey {
            table: self.table.clone(),
            key: key.to_string(),
        })
    }

    fn fetch(&self, store: &dyn ComponentStore) -> Result<BTreeMap<PrimaryKey, Record>> {
        let rows = store
            .fetch_all(&self.table)
            .map_err(|source| SyncError::Fetch {
                table: self.table.clone(),
                source,
            })?;

        let mut keyed = BTreeMap::new();
        for row in rows {
            let value = row.get(&self.primary).cloned().unwrap_or(Value::Null);
            let key = PrimaryKey::from_value(&value, self.integer_key).ok_or_else(|| {
                SyncError::InvalidKey {
                    table: self.table.clone(),
                    key: value.to_string(),
                }
            })?;
            keyed.insert(key, row);
        }
        Ok(keyed)
    }

    /// Local records may omit the primary-key column; the map key fills it.
    fn row_for_insert(&self, key: &PrimaryKey, record: &Record) -> Record {
        let mut row = record.clone();
        if !row.contains_key(&self.primary) {
            row.insert(self.primary.clone(), key.to_value());
        }
        row
    }

    fn replace(&mut self, rows: BTreeMap<PrimaryKey, Record>) -> Result<()> {
        self.records = rows
            .into_iter()
            .map(|(key, record)| (key.to_string(), record))
            .collect();
        self.persist()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    use modelsync_core::{FieldSpec, FieldType};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    /// Row store keyed by table name, rows in insertion order.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub(crate) tables: RefCell<HashMap<String, Vec<Record>>>,
        pub(crate) reject_insert: Option<String>,
        pub(crate) primary: String,
    }

    impl MemoryStore {
        pub(crate) fn keyed_by(primary: &str) -> Self {
            Self {
                primary: primary.to_string(),
                ..Self::default()
            }
        }

        pub(crate) fn seed(&self, table: &str, rows: Vec<Value>) {
            let rows = rows
                .into_iter()
                .filter_map(|row| row.as_object().cloned())
                .collect();
            self.tables.borrow_mut().insert(table.to_string(), rows);
        }

        pub(crate) fn keys(&self, table: &str) -> Vec<Value> {
            self.tables
                .borrow()
                .get(table)
                .map(|rows| rows.iter().map(|r| r[&self.primary].clone()).collect())
                .unwrap_or_default()
        }
    }

    impl ComponentStore for MemoryStore {
        fn fetch_all(&self, table: &str) -> std::result::Result<Vec<Record>, DriverError> {
            Ok(self.tables.borrow().get(table).cloned().unwrap_or_default())
        }

        fn insert(&self, table: &str, record: &Record) -> std::result::Result<(), DriverError> {
            let key = record.get(&self.primary).and_then(Value::as_str);
            if key.is_some() && key == self.reject_insert.as_deref() {
                return Err(DriverError::new("duplicate entry"));
            }
            self.tables
                .borrow_mut()
                .entry(table.to_string())
                .or_default()
                .push(record.clone());
            Ok(())
        }

        fn delete_where(
            &self,
            table: &str,
            column: &str,
            key: &PrimaryKey,
        ) -> std::result::Result<(), DriverError> {
            let target = key.to_value();
            if let Some(rows) = self.tables.borrow_mut().get_mut(table) {
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
        ) -> std::result::Result<(), DriverError> {
            let target = key.to_value();
            let mut tables = self.tables.borrow_mut();
            let row = tables
                .get_mut(table)
                .and_then(|rows| rows.iter_mut().find(|r| r.get(key_column) == Some(&target)))
                .ok_or_else(|| DriverError::new("no such row"))?;
            row.insert(column.to_string(), value.clone());
            Ok(())
        }
    }

    /// Fills column `w` with 5 on insert, like a column default.
    struct FilledStore {
        inner: MemoryStore,
    }

    impl ComponentStore for FilledStore {
        fn fetch_all(&self, table: &str) -> std::result::Result<Vec<Record>, DriverError> {
            self.inner.fetch_all(table)
        }

        fn insert(&self, table: &str, record: &Record) -> std::result::Result<(), DriverError> {
            let mut row = record.clone();
            row.entry("w").or_insert(json!(5));
            self.inner.insert(table, &row)
        }

        fn delete_where(
            &self,
            table: &str,
            column: &str,
            key: &PrimaryKey,
        ) -> std::result::Result<(), DriverError> {
            self.inner.delete_where(table, column, key)
        }

        fn update_field(
            &self,
            table: &str,
            key_column: &str,
            key: &PrimaryKey,
            column: &str,
            value: &Value,
        ) -> std::result::Result<(), DriverError> {
            self.inner.update_field(table, key_column, key, column, value)
        }
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    /// Replays answers and counts how often it was asked.
    pub(crate) struct ScriptedPrompt {
        pub(crate) answers: VecDeque<&'static str>,
        pub(crate) asked: usize,
    }

    impl ScriptedPrompt {
        pub(crate) fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                asked: 0,
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn ask(&mut self, _question: &str) -> Option<String> {
            self.asked += 1;
            self.answers.pop_front().map(str::to_string)
        }
    }

    fn items() -> TableModel {
        TableModel::new(
            "items",
            vec![
                FieldSpec::new("code", FieldType::VarChar).length(20).primary(),
                FieldSpec::new("v", FieldType::Int).length(11).nullable(),
            ],
            vec![],
        )
        .unwrap()
    }

    fn levels() -> TableModel {
        TableModel::new(
            "levels",
            vec![
                FieldSpec::new("id", FieldType::Int).length(11).primary(),
                FieldSpec::new("name", FieldType::VarChar).length(20),
            ],
            vec![],
        )
        .unwrap()
    }

    fn write_file(dir: &TempDir, table: &str, content: Value) {
        fs::write(
            ComponentCache::path_for(dir.path(), table),
            serde_json::to_string_pretty(&content).unwrap(),
        )
        .unwrap();
    }

    fn read_file(dir: &TempDir, table: &str) -> Value {
        let text = fs::read_to_string(ComponentCache::path_for(dir.path(), table)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let cache = ComponentCache::open(&items(), dir.path()).unwrap();
        assert!(cache.records().is_empty());
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(ComponentCache::path_for(dir.path(), "items"), "[1, 2").unwrap();
        assert!(matches!(
            ComponentCache::open(&items(), dir.path()),
            Err(SyncError::ComponentFormat { .. })
        ));
    }

    #[test]
    fn test_model_without_primary_key_is_rejected() {
        let model = TableModel::new(
            "logs",
            vec![FieldSpec::new("line", FieldType::Text)],
            vec![],
        )
        .unwrap();
        assert!(matches!(
            ComponentCache::new(&model, "."),
            Err(SyncError::MissingPrimaryKey(_))
        ));
    }

    #[test]
    fn test_empty_database_receives_every_record() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "items", json!({"a": {"v": 1}}));
        let store = MemoryStore::keyed_by("code");

        let mut cache = ComponentCache::open(&items(), dir.path()).unwrap();
        let report = cache.sync_with_database(&store).unwrap();

        assert_eq!(report.inserted, vec!["a"]);
        assert_eq!(store.keys("items"), vec![json!("a")]);
        assert_eq!(cache.records().len(), 1);
        assert_eq!(cache.get("a").unwrap()["v"], json!(1));
        assert_eq!(read_file(&dir, "items"), json!({"a": {"code": "a", "v": 1}}));
    }

    #[test]
    fn test_database_wins_after_sync() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "items", json!({"a": {"v": 1}, "b": {"v": 2}}));
        let store = MemoryStore::keyed_by("code");
        store.seed(
            "items",
            vec![json!({"code": "a", "v": 10}), json!({"code": "c", "v": 3})],
        );

        let mut cache = ComponentCache::open(&items(), dir.path()).unwrap();
        let report = cache.sync_with_database(&store).unwrap();

        assert_eq!(report.inserted, vec!["b"]);
        assert_eq!(report.deleted, vec!["c"]);
        assert_eq!(store.keys("items"), vec![json!("a"), json!("b")]);
        let keys: Vec<_> = cache.records().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(cache.get("a").unwrap()["v"], json!(10));
        assert_eq!(
            read_file(&dir, "items"),
            json!({"a": {"code": "a", "v": 10}, "b": {"code": "b", "v": 2}})
        );
        let database: Vec<Record> = store.fetch_all("items").unwrap();
        let memory: Vec<Record> = cache.records().values().cloned().collect();
        assert_eq!(memory, database);
    }

    #[test]
    fn test_memory_holds_rows_as_the_database_stores_them() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "items", json!({"a": {"v": 1}}));
        let store = FilledStore {
            inner: MemoryStore::keyed_by("code"),
        };

        let mut cache = ComponentCache::open(&items(), dir.path()).unwrap();
        cache.sync_with_database(&store).unwrap();

        let row = store.fetch_all("items").unwrap().remove(0);
        assert_eq!(row, record(json!({"code": "a", "v": 1, "w": 5})));
        assert_eq!(cache.get("a"), Some(&row));
        assert_eq!(read_file(&dir, "items"), json!({"a": {"code": "a", "v": 1, "w": 5}}));
    }

    #[test]
    fn test_keys_colliding_after_coercion_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "levels", json!({"0": {"name": "zero"}, "00": {"name": "also zero"}}));
        let store = MemoryStore::keyed_by("id");

        let mut cache = ComponentCache::open(&levels(), dir.path()).unwrap();
        assert!(matches!(
            cache.sync_with_database(&store),
            Err(SyncError::InvalidKey { ref key, .. }) if key == "00"
        ));
        assert!(store.keys("levels").is_empty());
        assert_eq!(cache.records().len(), 2);
    }

    #[test]
    fn test_integer_keys_are_coerced() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "levels", json!({"0": {"name": "zero"}}));
        let store = MemoryStore::keyed_by("id");
        store.seed("levels", vec![json!({"id": 0, "name": "zero"})]);

        let mut cache = ComponentCache::open(&levels(), dir.path()).unwrap();
        let report = cache.sync_with_database(&store).unwrap();

        assert!(report.inserted.is_empty());
        assert!(report.deleted.is_empty());
        assert_eq!(store.keys("levels"), vec![json!(0)]);
        assert!(cache.get("0").is_some());
    }

    #[test]
    fn test_non_integer_key_for_integer_primary() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "levels", json!({"zero": {"name": "zero"}}));
        let store = MemoryStore::keyed_by("id");

        let mut cache = ComponentCache::open(&levels(), dir.path()).unwrap();
        assert!(matches!(
            cache.sync_with_database(&store),
            Err(SyncError::InvalidKey { ref key, .. }) if key == "zero"
        ));
        assert!(store.keys("levels").is_empty());
    }

    #[test]
    fn test_insert_failures_do_not_stop_the_pass() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "items", json!({"a": {"v": 1}, "b": {"v": 2}, "c": {"v": 3}}));
        let store = MemoryStore {
            reject_insert: Some("b".to_string()),
            ..MemoryStore::keyed_by("code")
        };

        let mut cache = ComponentCache::open(&items(), dir.path()).unwrap();
        let report = cache.sync_with_database(&store).unwrap();

        assert_eq!(report.inserted, vec!["a", "c"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "b");
        assert!(!report.is_clean());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_empty_local_set_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::keyed_by("code");
        store.seed("items", vec![json!({"code": "a"})]);

        let mut cache = ComponentCache::open(&items(), dir.path()).unwrap();
        let report = cache.sync_with_database(&store).unwrap();

        assert_eq!(report, SyncReport::default());
        assert_eq!(store.keys("items"), vec![json!("a")]);
    }

    #[test]
    fn test_update_writes_database_then_memory() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::keyed_by("id");
        store.seed("levels", vec![json!({"id": 7, "name": "seven"})]);

        let mut cache = ComponentCache::new(&levels(), dir.path()).unwrap();
        cache.refresh_from_database(&store, &mut ScriptedPrompt::new(&[])).unwrap();

        let mut values = Record::new();
        values.insert("name".to_string(), json!("SEVEN"));
        cache.update(&store, "7", values).unwrap();

        assert_eq!(cache.get("7").unwrap()["name"], json!("SEVEN"));
        assert_eq!(store.fetch_all("levels").unwrap()[0]["name"], json!("SEVEN"));
        assert_eq!(read_file(&dir, "levels")["7"]["name"], json!("SEVEN"));
    }

    #[test]
    fn test_update_of_unknown_key_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::keyed_by("id");
        let mut cache = ComponentCache::new(&levels(), dir.path()).unwrap();

        let err = cache.update(&store, "9", Record::new()).unwrap_err();
        assert!(matches!(err, SyncError::NotFound { ref key, .. } if key == "9"));
        assert!(store.keys("levels").is_empty());
    }

    #[test]
    fn test_refresh_overwrites_local_state() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "items", json!({"old": {"v": 1}}));
        let store = MemoryStore::keyed_by("code");
        store.seed("items", vec![json!({"code": "new", "v": 2})]);

        let mut cache = ComponentCache::open(&items(), dir.path()).unwrap();
        let mut prompt = ScriptedPrompt::new(&[]);
        let outcome = cache.refresh_from_database(&store, &mut prompt).unwrap();

        assert_eq!(outcome, RefreshOutcome::Refreshed);
        assert_eq!(prompt.asked, 0);
        assert_eq!(read_file(&dir, "items"), json!({"new": {"code": "new", "v": 2}}));
    }

    #[test]
    fn test_refresh_conflict_reprompts_until_decided() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "items", json!({"a": {"v": 1}}));
        let store = MemoryStore::keyed_by("code");

        let mut cache = ComponentCache::open(&items(), dir.path()).unwrap();
        let mut prompt = ScriptedPrompt::new(&["maybe", "", "y"]);
        let outcome = cache.refresh_from_database(&store, &mut prompt).unwrap();

        assert_eq!(prompt.asked, 3);
        assert!(matches!(outcome, RefreshOutcome::Pushed(ref r) if r.inserted == ["a"]));
        assert_eq!(store.keys("items"), vec![json!("a")]);
    }

    #[test]
    fn test_refresh_conflict_discard() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "items", json!({"a": {"v": 1}}));
        let store = MemoryStore::keyed_by("code");

        let mut cache = ComponentCache::open(&items(), dir.path()).unwrap();
        let outcome = cache
            .refresh_from_database(&store, &mut ScriptedPrompt::new(&["n"]))
            .unwrap();

        assert_eq!(outcome, RefreshOutcome::Discarded);
        assert!(cache.records().is_empty());
        assert_eq!(read_file(&dir, "items"), json!({}));
        assert!(store.keys("items").is_empty());
    }

    #[test]
    fn test_refresh_conflict_without_answer() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "items", json!({"a": {"v": 1}}));
        let store = MemoryStore::keyed_by("code");

        let mut cache = ComponentCache::open(&items(), dir.path()).unwrap();
        let err = cache
            .refresh_from_database(&store, &mut ScriptedPrompt::new(&["what"]))
            .unwrap_err();
        assert!(matches!(err, SyncError::Conflict(ref table) if table == "items"));
        assert_eq!(cache.records().len(), 1);
    }
}
