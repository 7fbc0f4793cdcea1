//! Sync configuration and model files.
//!
//! [`SyncConfig`] controls how a sync pass behaves; model files declare the
//! tables to synchronise. Both are YAML.
//!
//! # Example config
//!
//! ```yaml
//! components_dir: ./components
//! migrate_schema: false
//! migrate_components: true
//! retry:
//!   attempts: 30
//!   interval_ms: 1000
//! ```
//!
//! # Example model file
//!
//! ```yaml
//! table: users
//! depends_on: [roles]
//! fields:
//!   - name: id
//!     type: int
//!     length: 11
//!     primary: true
//!     auto_increment: true
//!   - name: email
//!     type: varchar
//!     length: 120
//!     unique: true
//! ```
//!
//! A model file may also hold a list of such tables.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use modelsync_core::{FieldSpec, TableModel};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::reconcile::ApplyMode;

/// Bounded retry used while waiting for the database at startup.
///
/// # Examples
///
/// ```
/// # use modelsync_db::RetryPolicy;
/// let retry = RetryPolicy::default();
/// assert_eq!(retry.attempts, 30);
/// assert_eq!(retry.interval().as_millis(), 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Connection attempts before giving up. At least one is always made.
    pub attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub interval_ms: u64,
}

impl RetryPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval_ms: 1000,
        }
    }
}

/// Top-level sync configuration.
///
/// Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory holding `<table>.component.json` files.
    pub components_dir: PathBuf,
    /// Apply schema changes without asking.
    pub migrate_schema: bool,
    /// Push local component files to the database instead of only
    /// refreshing them.
    pub migrate_components: bool,
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            components_dir: PathBuf::from("./components"),
            migrate_schema: false,
            migrate_components: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](SyncError::Io) if the file cannot be read, or
    /// [`Yaml`](SyncError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn apply_mode(&self) -> ApplyMode {
        if self.migrate_schema {
            ApplyMode::Automatic
        } else {
            ApplyMode::Interactive
        }
    }
}

/// Serialized form of one table declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    pub table: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub fields: Vec<FieldSpec>,
}

impl TableDefinition {
    /// Validates the declaration into a [`TableModel`].
    pub fn into_model(self) -> Result<TableModel> {
        let table = self.table.clone();
        TableModel::new(self.table, self.fields, self.depends_on)
            .map_err(|source| SyncError::validation(&table, source))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelFile {
    Many(Vec<TableDefinition>),
    One(TableDefinition),
}

/// Parses model declarations from YAML (or JSON) text.
///
/// # Errors
///
/// Returns [`Yaml`](SyncError::Yaml) for malformed text and
/// [`Validation`](SyncError::Validation) for the first invalid table.
pub fn parse_models(text: &str) -> Result<Vec<TableModel>> {
    let definitions = match serde_yaml::from_str(text)? {
        ModelFile::Many(definitions) => definitions,
        ModelFile::One(definition) => vec![definition],
    };
    definitions
        .into_iter()
        .map(TableDefinition::into_model)
        .collect()
}

/// Reads and validates every table declared in a model file.
pub fn load_models(path: impl AsRef<Path>) -> Result<Vec<TableModel>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|err| SyncError::Config(format!("cannot read '{}': {err}", path.display())))?;
    parse_models(&text)
}
