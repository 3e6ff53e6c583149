//! The persistent-store boundary. The pipeline only ever sees this trait.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{SourceKind, TrackedEntity};
use crate::reconcile::{CommitSummary, ReconcilePlan};

#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Capability check performed at the cycle boundary.
    async fn is_available(&self) -> bool;

    async fn read_all(&self, kind: SourceKind) -> Result<Vec<TrackedEntity>>;

    /// Replace-on-conflict by identifier; every column is overwritten.
    async fn upsert(&self, kind: SourceKind, records: &[TrackedEntity]) -> Result<usize>;

    async fn delete(&self, kind: SourceKind, identifiers: &[String]) -> Result<usize>;

    async fn count(&self, kind: SourceKind) -> Result<usize>;

    /// Applies a reconcile plan. Stores that can should do this atomically;
    /// the default runs upsert then delete.
    async fn commit(&self, kind: SourceKind, plan: &ReconcilePlan) -> Result<CommitSummary> {
        let upserted = self.upsert(kind, &plan.upserts).await?;
        let deleted = self.delete(kind, &plan.deletes).await?;
        Ok(CommitSummary { upserted, deleted })
    }
}
