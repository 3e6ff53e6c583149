use crate::config::StorageConfig;
use crate::errors::Result;
use crate::models::{CycleLog, SourceKind};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// Cycle bookkeeping: advisory locks and a log of every run.
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        if let Some(parent) = config.catalog_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&config.catalog_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock()?;
        conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS cycle_locks (
                source TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                acquired_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS cycle_logs (
                cycle_id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER,
                status TEXT NOT NULL,
                details TEXT
            );
            COMMIT;",
        )?;
        Ok(())
    }

    /// Takes the advisory lock for `source` unless another live token holds it.
    /// Expired locks are reclaimed.
    pub fn try_acquire_lock(&self, source: SourceKind, token: &str, ttl_secs: i64) -> Result<bool> {
        let mut conn = self.conn.lock()?;
        let now = chrono::Utc::now().timestamp();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM cycle_locks WHERE source = ?1 AND expires_at <= ?2",
            params![source.as_str(), now],
        )?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO cycle_locks (source, token, acquired_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![source.as_str(), token, now, now + ttl_secs],
        )?;
        tx.commit()?;
        Ok(inserted == 1)
    }

    pub fn release_lock(&self, source: SourceKind, token: &str) -> Result<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "DELETE FROM cycle_locks WHERE source = ?1 AND token = ?2",
            params![source.as_str(), token],
        )?;
        Ok(())
    }

    pub fn lock_holder(&self, source: SourceKind) -> Result<Option<String>> {
        let conn = self.conn.lock()?;
        let token = conn
            .query_row(
                "SELECT token FROM cycle_locks WHERE source = ?1",
                params![source.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(token)
    }

    pub fn create_cycle_log(&self, cycle_id: &str, source: SourceKind) -> Result<()> {
        let conn = self.conn.lock()?;
        let start_time = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO cycle_logs (cycle_id, source, start_time, status) VALUES (?1, ?2, ?3, 'RUNNING')",
            params![cycle_id, source.as_str(), start_time],
        )?;
        Ok(())
    }

    pub fn update_cycle_log_status(&self, cycle_id: &str, status: &str, details: &str) -> Result<()> {
        let conn = self.conn.lock()?;
        let end_time = chrono::Utc::now().timestamp();
        conn.execute(
            "UPDATE cycle_logs SET status = ?1, details = ?2, end_time = ?3 WHERE cycle_id = ?4",
            params![status, details, end_time, cycle_id],
        )?;
        Ok(())
    }

    pub fn recent_cycle_logs(&self, limit: usize) -> Result<Vec<CycleLog>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT cycle_id, source, start_time, end_time, status, COALESCE(details, '')
             FROM cycle_logs ORDER BY start_time DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(CycleLog {
                cycle_id: row.get(0)?,
                source: row.get(1)?,
                start_time: row.get(2)?,
                end_time: row.get(3)?,
                status: row.get(4)?,
                details: row.get(5)?,
            })
        })?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }
}
