//! Live-database side of model synchronisation.
//!
//! This crate compares declared [`TableModel`](modelsync_core::TableModel)s
//! with a running MySQL schema and keeps JSON component files in step with
//! their tables:
//!
//! - [`Database`] is the SQL execution seam; [`introspect`] reads a table's
//!   columns and indexes through it into [`ColumnSnapshot`]s.
//! - [`plan`] and [`apply`] detect drift and run the resulting DDL, asking a
//!   [`Confirm`] strategy first in [`ApplyMode::Interactive`].
//! - [`ComponentCache`] reconciles `<table>.component.json` with the
//!   database through the [`ComponentStore`] seam.
//! - [`ModelRegistry`] and [`Synchronizer`] drive all of the above for every
//!   table at startup, configured by a [`SyncConfig`].
//!
//! # Quick start
//!
//! ```
//! use modelsync_core::{FieldSpec, FieldType, TableModel};
//! use modelsync_db::{ActionKind, ColumnSnapshot, plan};
//!
//! let users = TableModel::new(
//!     "users",
//!     vec![
//!         FieldSpec::new("id", FieldType::Int).length(11).primary(),
//!         FieldSpec::new("email", FieldType::VarChar).length(120),
//!     ],
//!     vec![],
//! )
//! .unwrap();
//!
//! let live = vec![ColumnSnapshot {
//!     field: "id".into(),
//!     column_type: "int(11)".into(),
//!     nullable: "NO".into(),
//!     is_primary: true,
//!     ..Default::default()
//! }];
//!
//! let actions = plan(&users, &live);
//! assert_eq!(actions.len(), 1);
//! assert_eq!(actions[0].kind, ActionKind::AddColumn);
//! assert_eq!(
//!     actions[0].sql,
//!     "ALTER TABLE `users` ADD COLUMN `email` VARCHAR(120) NOT NULL;"
//! );
//! ```

mod component;
mod config;
mod database;
mod error;
mod introspect;
mod prompt;
mod reconcile;
mod registry;
mod sync;

pub use component::{
    COMPONENT_SUFFIX, ComponentCache, ComponentFailure, ComponentSet, ComponentStore, PrimaryKey,
    Record, RefreshOutcome, SyncReport,
};
pub use config::{RetryPolicy, SyncConfig, TableDefinition, load_models, parse_models};
pub use database::{Database, Row};
pub use error::{DriverError, Result, SyncError};
pub use introspect::{ColumnSnapshot, PRIMARY_INDEX, introspect};
pub use prompt::{ConsolePrompt, Prompt};
pub use reconcile::{
    Action, ActionKind, ApplyMode, AutoApprove, Confirm, ReconcileReport, apply, plan, reconcile,
};
pub use registry::ModelRegistry;
pub use sync::{
    ComponentOutcome, SchemaOutcome, Synchronizer, TableReport, component_phase,
    connect_with_retry,
};
