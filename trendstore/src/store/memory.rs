use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::PersistentStore;
use crate::errors::{Result, StorageError};
use crate::models::{SourceKind, TrackedEntity};
use crate::reconcile::{CommitSummary, ReconcilePlan};

/// Process-local store. Commits stage the whole plan before swapping it in,
/// so a failed commit leaves the previous rows untouched.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<SourceKind, BTreeMap<String, TrackedEntity>>>,
    unavailable: AtomicBool,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Makes every write fail, for exercising the no-partial-commit path.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store rejecting writes".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    async fn read_all(&self, kind: SourceKind) -> Result<Vec<TrackedEntity>> {
        let tables = self.tables.lock()?;
        Ok(tables
            .get(&kind)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert(&self, kind: SourceKind, records: &[TrackedEntity]) -> Result<usize> {
        self.ensure_writable()?;
        let mut tables = self.tables.lock()?;
        let table = tables.entry(kind).or_default();
        for record in records {
            table.insert(record.identifier.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn delete(&self, kind: SourceKind, identifiers: &[String]) -> Result<usize> {
        self.ensure_writable()?;
        let mut tables = self.tables.lock()?;
        let table = tables.entry(kind).or_default();
        Ok(identifiers
            .iter()
            .filter(|identifier| table.remove(identifier.as_str()).is_some())
            .count())
    }

    async fn count(&self, kind: SourceKind) -> Result<usize> {
        let tables = self.tables.lock()?;
        Ok(tables.get(&kind).map(BTreeMap::len).unwrap_or(0))
    }

    async fn commit(&self, kind: SourceKind, plan: &ReconcilePlan) -> Result<CommitSummary> {
        self.ensure_writable()?;
        let mut tables = self.tables.lock()?;
        let mut staged = tables.get(&kind).cloned().unwrap_or_default();
        for record in &plan.upserts {
            staged.insert(record.identifier.clone(), record.clone());
        }
        let deleted = plan
            .deletes
            .iter()
            .filter(|identifier| staged.remove(identifier.as_str()).is_some())
            .count();
        tables.insert(kind, staged);
        Ok(CommitSummary {
            upserted: plan.upserts.len(),
            deleted,
        })
    }
}
