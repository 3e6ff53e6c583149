use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::errors::{CycleError, Result};
use crate::fetch::{SkippedItem, SourceFetcher};
use crate::models::{CycleLog, CycleReport, SourceKind, TrackedEntity, Trend};
use crate::pipeline::{self, categorize::Categorizer};
use crate::reconcile::Reconciler;
use crate::rules::RuleTable;
use crate::store::PersistentStore;
use crate::synthetic;

pub const DEFAULT_LOCK_TTL_SECS: i64 = 900;

#[derive(Debug, Clone, Serialize)]
pub struct FetcherInfo {
    pub source: SourceKind,
    pub name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub source: SourceKind,
    pub table: &'static str,
    pub rows: usize,
    pub fetcher: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunnerStatus {
    pub store_available: bool,
    pub sources: Vec<SourceStatus>,
    pub recent_cycles: Vec<CycleLog>,
}

/// Drives one collection cycle per call: fetch, select, score, classify,
/// reconcile against the stored snapshot, commit.
///
/// At most one cycle per source runs at a time. The in-process mutex rejects
/// overlapping triggers in this process; the catalog lock row rejects them
/// across processes sharing the same catalog.
pub struct CycleRunner {
    store: Arc<dyn PersistentStore>,
    catalog: Arc<Catalog>,
    rules: Arc<RuleTable>,
    categorizer: Categorizer,
    fetchers: RwLock<HashMap<SourceKind, Arc<dyn SourceFetcher>>>,
    guards: [Arc<Mutex<()>>; 3],
}

impl CycleRunner {
    pub fn new(store: Arc<dyn PersistentStore>, catalog: Arc<Catalog>, rules: Arc<RuleTable>) -> Self {
        let categorizer = Categorizer::new(&rules.categories);
        Self {
            store,
            catalog,
            rules,
            categorizer,
            fetchers: RwLock::new(HashMap::new()),
            guards: Default::default(),
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Registers a fetcher for the source it reports. A later registration
    /// for the same source replaces the earlier one.
    pub fn register_fetcher(&self, fetcher: Arc<dyn SourceFetcher>) {
        let kind = fetcher.kind();
        log::info!("Registering fetcher '{}' for source '{}'", fetcher.name(), kind);
        self.fetchers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, fetcher);
    }

    pub fn list_fetchers(&self) -> Vec<FetcherInfo> {
        let fetchers = self.fetchers.read().unwrap_or_else(PoisonError::into_inner);
        let mut infos: Vec<_> = fetchers
            .iter()
            .map(|(source, fetcher)| FetcherInfo {
                source: *source,
                name: fetcher.name(),
            })
            .collect();
        infos.sort_by_key(|info| info.source);
        infos
    }

    fn fetcher(&self, kind: SourceKind) -> Option<Arc<dyn SourceFetcher>> {
        self.fetchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    fn guard(&self, kind: SourceKind) -> Arc<Mutex<()>> {
        let slot = match kind {
            SourceKind::Repositories => 0,
            SourceKind::Models => 1,
            SourceKind::Keywords => 2,
        };
        Arc::clone(&self.guards[slot])
    }

    pub async fn run_cycle(&self, kind: SourceKind) -> std::result::Result<CycleReport, CycleError> {
        let _guard = self
            .guard(kind)
            .try_lock_owned()
            .map_err(|_| CycleError::CycleInProgress(kind))?;

        let token = Uuid::new_v4().to_string();
        if !self.catalog.try_acquire_lock(kind, &token, DEFAULT_LOCK_TTL_SECS)? {
            return Err(CycleError::CycleInProgress(kind));
        }

        let cycle_id = Uuid::new_v4().to_string();
        let result = match self.catalog.create_cycle_log(&cycle_id, kind) {
            Ok(()) => self.execute(kind, &cycle_id).await,
            Err(e) => Err(e.into()),
        };

        let (status, details) = match &result {
            Ok(report) => (
                "SUCCESS",
                serde_json::to_string(report).unwrap_or_else(|e| e.to_string()),
            ),
            Err(e) => ("FAILED", e.to_string()),
        };
        if let Err(e) = self.catalog.update_cycle_log_status(&cycle_id, status, &details) {
            log::warn!("Cycle {cycle_id}: failed to record status: {e}");
        }
        if let Err(e) = self.catalog.release_lock(kind, &token) {
            log::warn!("Cycle {cycle_id}: failed to release lock for '{kind}': {e}");
        }

        result
    }

    async fn execute(&self, kind: SourceKind, cycle_id: &str) -> std::result::Result<CycleReport, CycleError> {
        let fetcher = self.fetcher(kind).ok_or(CycleError::NoFetcher(kind))?;
        if !self.store.is_available().await {
            return Err(CycleError::StoreUnavailable(kind));
        }

        let rules = self.rules.for_source(kind);
        log::info!("Cycle {cycle_id}: fetching '{kind}' with {}", fetcher.name());
        let outcome = fetcher.fetch(rules).await;

        let failed_buckets = outcome.failed_labels();
        for label in &failed_buckets {
            log::warn!("Cycle {cycle_id}: bucket '{label}' failed and contributed nothing");
        }
        let skipped: Vec<SkippedItem> = outcome.skipped().cloned().collect();
        for item in &skipped {
            log::warn!("Cycle {cycle_id}: skipped '{}': {}", item.identifier, item.reason);
        }
        if outcome.is_empty() {
            return Err(CycleError::EmptyBatch(kind));
        }

        let selection = pipeline::select(outcome.buckets, rules);
        if selection.entities.is_empty() {
            return Err(CycleError::EmptyBatch(kind));
        }

        // The snapshot is read exactly once, before anything is written.
        let reconciler = Reconciler::new(self.store.read_all(kind).await?);
        let now = Utc::now();
        let batch = pipeline::build_batch(
            kind,
            &selection,
            &reconciler,
            rules,
            &self.categorizer,
            now,
        );
        let trends = trend_counts(&batch);
        let distribution = match kind {
            SourceKind::Models => category_counts(&batch),
            SourceKind::Repositories | SourceKind::Keywords => trends.clone(),
        };

        let plan = reconciler.plan(batch);
        let summary = self.store.commit(kind, &plan).await?;
        log::info!(
            "Cycle {cycle_id}: '{kind}' collected {} (deleted {}, skipped {}, prior {})",
            summary.upserted,
            summary.deleted,
            skipped.len(),
            reconciler.prior_len()
        );

        Ok(CycleReport {
            cycle_id: cycle_id.to_string(),
            source: kind,
            collected_count: summary.upserted,
            deleted_count: summary.deleted,
            skipped_count: skipped.len(),
            failed_buckets,
            distribution,
            trends,
            dropped: selection.dropped,
            notes: skipped
                .iter()
                .map(|item| format!("{}: {}", item.identifier, item.reason))
                .collect(),
            collected_at: now,
        })
    }

    /// Writes the synthetic keyword rows. Runs under the keyword cycle guard
    /// so it never interleaves with a real keyword cycle.
    pub async fn seed_keywords(&self) -> std::result::Result<usize, CycleError> {
        let kind = SourceKind::Keywords;
        let _guard = self
            .guard(kind)
            .try_lock_owned()
            .map_err(|_| CycleError::CycleInProgress(kind))?;
        if !self.store.is_available().await {
            return Err(CycleError::StoreUnavailable(kind));
        }
        let rows = synthetic::seed_keywords(Utc::now());
        let written = self.store.upsert(kind, &rows).await?;
        log::info!(
            "Seeded {written} {} keyword rows into '{}'",
            synthetic::SYNTHETIC_LABEL,
            kind.table_name()
        );
        Ok(written)
    }

    pub async fn status(&self) -> Result<RunnerStatus> {
        let store_available = self.store.is_available().await;
        let fetchers = self.list_fetchers();
        let mut sources = Vec::with_capacity(SourceKind::ALL.len());
        for kind in SourceKind::ALL {
            let rows = if store_available {
                self.store.count(kind).await?
            } else {
                0
            };
            sources.push(SourceStatus {
                source: kind,
                table: kind.table_name(),
                rows,
                fetcher: fetchers
                    .iter()
                    .find(|info| info.source == kind)
                    .map(|info| info.name),
            });
        }
        Ok(RunnerStatus {
            store_available,
            sources,
            recent_cycles: self.catalog.recent_cycle_logs(10)?,
        })
    }
}

fn trend_counts(batch: &[TrackedEntity]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = [Trend::Rising, Trend::Stable, Trend::Falling]
        .iter()
        .map(|trend| (trend.as_str().to_string(), 0))
        .collect();
    for entity in batch {
        *counts.entry(entity.trend.as_str().to_string()).or_default() += 1;
    }
    counts
}

fn category_counts(batch: &[TrackedEntity]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entity in batch {
        if let Some(category) = entity.category {
            *counts.entry(category.as_str().to_string()).or_default() += 1;
        }
    }
    counts
}
