//! SQLite job store (feature `sqlite`).
//!
//! One `jobs` table keyed by job id.  Payload and result are stored as JSON
//! text, timestamps as RFC 3339.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::{Job, JobStore, StoreError, StoreResult};

pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             CREATE TABLE IF NOT EXISTS jobs (
                 id          TEXT PRIMARY KEY,
                 status      TEXT NOT NULL,
                 payload     TEXT NOT NULL,
                 result      TEXT,
                 error       TEXT,
                 created_at  TEXT NOT NULL,
                 updated_at  TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Corrupt("connection lock poisoned".into()))
    }
}

type JobRow = (String, String, String, Option<String>, Option<String>, String, String);

impl JobStore for SqliteJobStore {
    fn save(&self, job: &Job) -> StoreResult<()> {
        let payload = serde_json::to_string(&job.payload)?;
        let result = job.result.as_ref().map(serde_json::to_string).transpose()?;
        self.lock()?.execute(
            "INSERT OR REPLACE INTO jobs \
             (id, status, payload, result, error, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                job.id.to_string(),
                job.status.as_str(),
                payload,
                result,
                job.error,
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let row: Option<JobRow> = self
            .lock()?
            .query_row(
                "SELECT id, status, payload, result, error, created_at, updated_at \
                 FROM jobs WHERE id = ?1",
                [id.to_string()],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?)),
            )
            .optional()?;

        let Some((id, status, payload, result, error, created_at, updated_at)) = row else {
            return Ok(None);
        };
        Ok(Some(Job {
            id:         Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt(format!("id {id:?}: {e}")))?,
            status:     status.parse().map_err(StoreError::Corrupt)?,
            payload:    serde_json::from_str(&payload)?,
            result:     result.as_deref().map(serde_json::from_str).transpose()?,
            error,
            created_at: parse_time(&created_at)?,
            updated_at: parse_time(&updated_at)?,
        }))
    }
}

fn parse_time(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {s:?}: {e}")))
}
