//! Startup synchronisation of every registered table.
//!
//! [`Synchronizer::run`] waits for the database, then takes each model from
//! a [`ModelRegistry`] in dependency order and, for that table alone:
//!
//! 1. introspects the live table;
//! 2. creates it when absent, otherwise reconciles drift;
//! 3. if `<components_dir>/<table>.component.json` exists, syncs or
//!    refreshes the component cache.
//!
//! Tables are processed one at a time. The first error stops the run and is
//! returned to the caller.

use std::collections::BTreeMap;
use std::thread;

use modelsync_core::{TableModel, create_table_sql};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::component::{ComponentCache, ComponentStore, RefreshOutcome, SyncReport};
use crate::config::{RetryPolicy, SyncConfig};
use crate::database::Database;
use crate::error::{Result, SyncError};
use crate::introspect::introspect;
use crate::prompt::Prompt;
use crate::reconcile::{Confirm, ReconcileReport, reconcile};
use crate::registry::ModelRegistry;

/// Pings `db` until it answers or the policy's attempts are used up.
///
/// Returns the number of attempts made.
///
/// # Errors
///
/// Returns [`SyncError::Connectivity`] carrying the last driver error.
pub fn connect_with_retry(db: &dyn Database, retry: &RetryPolicy) -> Result<u32> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        match db.ping() {
            Ok(()) => {
                info!(attempt, "database reachable");
                return Ok(attempt);
            }
            Err(source) if attempt >= attempts => {
                return Err(SyncError::Connectivity { attempts, source });
            }
            Err(err) => {
                warn!(attempt, attempts, error = %err, "database not reachable, retrying");
                thread::sleep(retry.interval());
                attempt += 1;
            }
        }
    }
}

/// What happened to a table's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum SchemaOutcome {
    /// The table did not exist and was created.
    Created { sql: String },
    Reconciled(ReconcileReport),
}

/// What happened to a table's component cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentOutcome {
    Synced(SyncReport),
    Refreshed(RefreshOutcome),
}

/// Result of synchronising one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub schema: SchemaOutcome,
    /// `None` when the table has no component file.
    pub components: Option<ComponentOutcome>,
}

/// Drives schema and component sync for a set of models.
///
/// `operator` confirms DDL in interactive mode and resolves component
/// conflicts.
pub struct Synchronizer<'a, O> {
    db: &'a dyn Database,
    store: &'a dyn ComponentStore,
    config: SyncConfig,
    operator: O,
    caches: BTreeMap<String, ComponentCache>,
}

impl<'a, O: Confirm + Prompt> Synchronizer<'a, O> {
    pub fn new(
        db: &'a dyn Database,
        store: &'a dyn ComponentStore,
        config: SyncConfig,
        operator: O,
    ) -> Self {
        Self {
            db,
            store,
            config,
            operator,
            caches: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Component cache of `table`, once a run has loaded it.
    pub fn component(&self, table: &str) -> Option<&ComponentCache> {
        self.caches.get(table)
    }

    pub fn component_mut(&mut self, table: &str) -> Option<&mut ComponentCache> {
        self.caches.get_mut(table)
    }

    /// Synchronises every model in `registry`, draining it.
    pub fn run(&mut self, registry: &mut ModelRegistry) -> Result<Vec<TableReport>> {
        connect_with_retry(self.db, &self.config.retry)?;
        let models = registry.drain()?;
        info!(tables = models.len(), mode = ?self.config.apply_mode(), "starting sync");

        let mut reports = Vec::with_capacity(models.len());
        for model in &models {
            reports.push(self.sync_table(model)?);
        }
        Ok(reports)
    }

    /// Synchronises a single table.
    pub fn sync_table(&mut self, model: &TableModel) -> Result<TableReport> {
        let table = model.name();
        let live = introspect(self.db, table)?;

        let schema = if live.is_empty() {
            let sql = create_table_sql(model);
            self.db
                .exec(&sql, &[])
                .map_err(|source| SyncError::Execution {
                    table: table.to_string(),
                    column: "*".to_string(),
                    action: "create table".to_string(),
                    sql: sql.clone(),
                    source,
                })?;
            info!(table, "created table");
            SchemaOutcome::Created { sql }
        } else {
            let report = reconcile(
                self.db,
                model,
                &live,
                self.config.apply_mode(),
                &mut self.operator,
            )?;
            if report.is_clean() {
                info!(table, "schema up to date");
            }
            SchemaOutcome::Reconciled(report)
        };

        let components = self.sync_components(model)?;
        Ok(TableReport {
            table: table.to_string(),
            schema,
            components,
        })
    }

    fn sync_components(&mut self, model: &TableModel) -> Result<Option<ComponentOutcome>> {
        let Some((cache, outcome)) =
            component_phase(model, self.store, &self.config, &mut self.operator)?
        else {
            return Ok(None);
        };
        self.caches.insert(model.name().to_string(), cache);
        Ok(Some(outcome))
    }
}

/// Runs the component phase of one table.
///
/// Returns `None` when `<components_dir>/<table>.component.json` does not
/// exist. Otherwise the file is loaded and either pushed with
/// [`ComponentCache::sync_with_database`] (`migrate_components`) or
/// refreshed with [`ComponentCache::refresh_from_database`], asking `prompt`
/// on conflicts.
pub fn component_phase(
    model: &TableModel,
    store: &dyn ComponentStore,
    config: &SyncConfig,
    prompt: &mut dyn Prompt,
) -> Result<Option<(ComponentCache, ComponentOutcome)>> {
    let path = ComponentCache::path_for(&config.components_dir, model.name());
    if !path.exists() {
        debug!(table = model.name(), path = %path.display(), "no component file");
        return Ok(None);
    }

    let mut cache = ComponentCache::open(model, &config.components_dir)?;
    let outcome = if config.migrate_components {
        ComponentOutcome::Synced(cache.sync_with_database(store)?)
    } else {
        ComponentOutcome::Refreshed(cache.refresh_from_database(store, prompt)?)
    };
    info!(table = model.name(), components = cache.records().len(), "components ready");
    Ok(Some((cache, outcome)))
}
