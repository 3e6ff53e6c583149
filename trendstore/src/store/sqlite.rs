use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::PersistentStore;
use crate::errors::{Result, StorageError};
use crate::models::{Category, EntityDetails, SourceKind, TrackedEntity, Trend};
use crate::reconcile::{CommitSummary, ReconcilePlan};

/// One SQLite table per source, keyed by identifier.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock()?;
        for kind in SourceKind::ALL {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    identifier TEXT PRIMARY KEY,
                    primary_metric INTEGER NOT NULL,
                    previous_metric INTEGER NOT NULL,
                    has_history INTEGER NOT NULL,
                    change_pct INTEGER NOT NULL,
                    trend TEXT NOT NULL,
                    category TEXT,
                    rank INTEGER,
                    collected_at INTEGER NOT NULL,
                    details TEXT NOT NULL
                );",
                table = kind.table_name()
            ))?;
        }
        Ok(())
    }
}

struct StoredRow {
    identifier: String,
    primary_metric: i64,
    previous_metric: i64,
    has_history: bool,
    change_pct: i64,
    trend: String,
    category: Option<String>,
    rank: Option<i64>,
    collected_at: i64,
    details: String,
}

impl TryFrom<StoredRow> for TrackedEntity {
    type Error = StorageError;

    fn try_from(row: StoredRow) -> Result<Self> {
        let collected_at = DateTime::<Utc>::from_timestamp_micros(row.collected_at).ok_or_else(
            || StorageError::InvalidArg(format!("bad collected_at for {}", row.identifier)),
        )?;
        let details: EntityDetails = serde_json::from_str(&row.details)?;
        Ok(TrackedEntity {
            primary_metric: to_u64(row.primary_metric),
            previous_metric: to_u64(row.previous_metric),
            has_history: row.has_history,
            change_pct: row.change_pct,
            trend: Trend::from_str(&row.trend)?,
            category: row.category.as_deref().map(Category::from_str).transpose()?,
            rank: row.rank.and_then(|rank| u32::try_from(rank).ok()),
            collected_at,
            details,
            identifier: row.identifier,
        })
    }
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn write_upserts(conn: &Connection, kind: SourceKind, records: &[TrackedEntity]) -> Result<usize> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {table} (identifier, primary_metric, previous_metric, has_history, change_pct,
                              trend, category, rank, collected_at, details)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(identifier) DO UPDATE SET
            primary_metric = excluded.primary_metric,
            previous_metric = excluded.previous_metric,
            has_history = excluded.has_history,
            change_pct = excluded.change_pct,
            trend = excluded.trend,
            category = excluded.category,
            rank = excluded.rank,
            collected_at = excluded.collected_at,
            details = excluded.details",
        table = kind.table_name()
    ))?;
    for record in records {
        let details = serde_json::to_string(&record.details)?;
        stmt.execute(params![
            record.identifier,
            to_i64(record.primary_metric),
            to_i64(record.previous_metric),
            record.has_history,
            record.change_pct,
            record.trend.as_str(),
            record.category.map(|c| c.as_str()),
            record.rank.map(i64::from),
            record.collected_at.timestamp_micros(),
            details,
        ])?;
    }
    Ok(records.len())
}

fn write_deletes(conn: &Connection, kind: SourceKind, identifiers: &[String]) -> Result<usize> {
    let mut stmt = conn.prepare(&format!(
        "DELETE FROM {table} WHERE identifier = ?1",
        table = kind.table_name()
    ))?;
    let mut deleted = 0;
    for identifier in identifiers {
        deleted += stmt.execute(params![identifier])?;
    }
    Ok(deleted)
}

#[async_trait]
impl PersistentStore for SqliteStore {
    async fn is_available(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok(),
            Err(_) => false,
        }
    }

    async fn read_all(&self, kind: SourceKind) -> Result<Vec<TrackedEntity>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT identifier, primary_metric, previous_metric, has_history, change_pct,
                    trend, category, rank, collected_at, details
             FROM {table} ORDER BY identifier",
            table = kind.table_name()
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredRow {
                identifier: row.get(0)?,
                primary_metric: row.get(1)?,
                previous_metric: row.get(2)?,
                has_history: row.get(3)?,
                change_pct: row.get(4)?,
                trend: row.get(5)?,
                category: row.get(6)?,
                rank: row.get(7)?,
                collected_at: row.get(8)?,
                details: row.get(9)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(TrackedEntity::try_from(row?)?);
        }
        Ok(records)
    }

    async fn upsert(&self, kind: SourceKind, records: &[TrackedEntity]) -> Result<usize> {
        let conn = self.conn.lock()?;
        write_upserts(&conn, kind, records)
    }

    async fn delete(&self, kind: SourceKind, identifiers: &[String]) -> Result<usize> {
        let conn = self.conn.lock()?;
        write_deletes(&conn, kind, identifiers)
    }

    async fn count(&self, kind: SourceKind) -> Result<usize> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn commit(&self, kind: SourceKind, plan: &ReconcilePlan) -> Result<CommitSummary> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let upserted = write_upserts(&tx, kind, &plan.upserts)?;
        let deleted = write_deletes(&tx, kind, &plan.deletes)?;
        tx.commit()?;
        log::info!(
            "Committed {} upserts and {} deletes to '{}'",
            upserted,
            deleted,
            kind.table_name()
        );
        Ok(CommitSummary { upserted, deleted })
    }
}
