//! SQLite storage.
//!
//! [`Database`] owns a single connection behind a mutex, which makes every
//! operation single-writer. The repository modules below are plain functions
//! over a `&Connection`, so the service layer can run several of them inside
//! one [`Database::transaction`] and have them commit or roll back together.

mod schema;

pub(crate) mod reviews;
pub(crate) mod rounds;
pub(crate) mod settings;
pub(crate) mod words;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, TransactionBehavior};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{StudyError, StudyResult};
use crate::models::Grade;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        schema::run_migrations(&conn)
    }

    fn lock(&self) -> StudyResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StudyError::LockPoisoned)
    }

    /// Run read-only work against the connection.
    pub fn read<T, F>(&self, f: F) -> StudyResult<T>
    where
        F: FnOnce(&Connection) -> StudyResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside one immediate transaction.
    ///
    /// The write lock is taken up front, so a lookup-then-insert inside `f`
    /// cannot race another writer. The transaction commits only when `f`
    /// returns `Ok`; on error it is dropped, which rolls everything back.
    pub fn transaction<T, F>(&self, f: F) -> StudyResult<T>
    where
        F: FnOnce(&Connection) -> StudyResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// ============================================================
// Column helpers
// ============================================================

pub(crate) fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

pub(crate) fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Fixed-width timestamps so that text comparison in SQL orders correctly.
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn grade_column(row: &Row, idx: usize) -> rusqlite::Result<Grade> {
    let raw: i64 = row.get(idx)?;
    Grade::from_i64(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, format!("invalid grade {raw}").into())
    })
}

/// `?, ?, ?` for an `IN (...)` list of `n` items.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
