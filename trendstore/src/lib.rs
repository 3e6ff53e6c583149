pub mod catalog;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod pacing;
pub mod pipeline;
pub mod reconcile;
pub mod rules;
pub mod store;
pub mod sync;
pub mod synthetic;

use crate::catalog::Catalog;
use crate::config::StorageConfig;
use crate::errors::Result;
use crate::rules::RuleTable;
use crate::store::{PersistentStore, SqliteStore};
use crate::sync::CycleRunner;
use std::sync::Arc;

/// The main entry point for the `trendstore` library.
///
/// `TrendStorage` wires together everything a collection cycle needs:
/// - A persistent store (`SqliteStore`) with one table per source.
/// - A metadata database (`Catalog`) holding cycle logs and advisory locks.
/// - The rule table, loaded from JSON or built in, validated once here.
/// - A `CycleRunner` that fetchers are registered with.
///
/// # Example
///
/// ```rust,no_run
/// use trendstore::{TrendStorage, config::StorageConfig, models::SourceKind};
/// use tempfile::tempdir;
///
/// #[tokio::main]
/// async fn main() {
///     let dir = tempdir().unwrap();
///     let storage = TrendStorage::new(StorageConfig::new(dir.path())).unwrap();
///     // Register fetchers, then:
///     let _ = storage.runner.run_cycle(SourceKind::Models).await;
/// }
/// ```
pub struct TrendStorage {
    pub config: StorageConfig,
    pub catalog: Arc<Catalog>,
    pub store: Arc<dyn PersistentStore>,
    pub rules: Arc<RuleTable>,
    pub runner: Arc<CycleRunner>,
}

impl TrendStorage {
    /// Opens the SQLite trend store and catalog under the configured paths and
    /// loads the rule table.
    pub fn new(config: StorageConfig) -> Result<Self> {
        let catalog = Arc::new(Catalog::new(&config)?);
        catalog.initialize_schema()?;

        let store: Arc<dyn PersistentStore> = Arc::new(SqliteStore::open(&config.trends_path)?);
        let rules = Arc::new(RuleTable::load(config.rules_path.as_deref())?);
        Ok(Self::with_parts(config, catalog, store, rules))
    }

    /// Assembles storage from already-built parts, e.g. an in-memory store.
    pub fn with_parts(
        config: StorageConfig,
        catalog: Arc<Catalog>,
        store: Arc<dyn PersistentStore>,
        rules: Arc<RuleTable>,
    ) -> Self {
        let runner = Arc::new(CycleRunner::new(
            Arc::clone(&store),
            Arc::clone(&catalog),
            Arc::clone(&rules),
        ));
        Self {
            config,
            catalog,
            store,
            rules,
            runner,
        }
    }
}
