//! SQLite backend for component tables.
//!
//! [`SqliteComponentStore`] implements
//! [`ComponentStore`](modelsync_db::ComponentStore) over a borrowed
//! [`rusqlite::Connection`], so a
//! [`ComponentCache`](modelsync_db::ComponentCache) can be synchronised
//! against a local database file.
//!
//! # Architecture
//!
//! - **`schema`**: SQLite `CREATE TABLE` generation from a model
//! - **`convert`**: JSON ↔ SQLite value conversion
//! - **`store`**: the row operations used by component sync
//!
//! # Quick start
//!
//! ```no_run
//! use modelsync_db::{ComponentCache, load_models};
//! use modelsync_sqlite::SqliteComponentStore;
//! use rusqlite::Connection;
//!
//! let conn = Connection::open("app.db").unwrap();
//! let store = SqliteComponentStore::new(&conn);
//!
//! for model in load_models("models/levels.yml").unwrap() {
//!     store.ensure_table(&model).unwrap();
//!     let mut cache = ComponentCache::open(&model, "components").unwrap();
//!     let report = cache.sync_with_database(&store).unwrap();
//!     println!("{}: {} inserted, {} deleted", model.name(), report.inserted.len(), report.deleted.len());
//! }
//! ```
//!
//! Table and column names must start with a letter and contain only
//! alphanumeric characters and underscores.

mod convert;
mod error;
mod schema;
mod store;

pub use error::{Result, SqliteError};
pub use schema::{affinity, create_table_sql};
pub use store::SqliteComponentStore;
