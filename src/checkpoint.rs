use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::util::now_utc_string;

pub const CHECKPOINT_FILE: &str = "checkpoint.sqlite";

/// What an entry in the checkpoint store refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EntryKind {
    Text,
    Links,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Links => "links",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    pub source_sha256: Option<String>,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub kind: String,
    pub key: String,
    pub message: String,
    pub logged_at: String,
}

/// Uploaded-title bookkeeping and failure log, kept in SQLite.
pub struct CheckpointStore {
    connection: Connection,
}

impl CheckpointStore {
    pub fn open(path: &Path) -> Result<Self> {
        let connection = Connection::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().context("failed to open in-memory db")?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    pub fn uploaded(&self, kind: EntryKind, key: &str) -> Result<Option<UploadEntry>> {
        self.connection
            .query_row(
                "SELECT source_sha256, uploaded_at FROM uploads WHERE kind = ?1 AND key = ?2",
                params![kind.as_str(), key],
                |row| {
                    Ok(UploadEntry {
                        source_sha256: row.get(0)?,
                        uploaded_at: row.get(1)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("failed to look up {} checkpoint for {key}", kind.as_str()))
    }

    pub fn mark_uploaded(
        &self,
        kind: EntryKind,
        key: &str,
        source_sha256: Option<&str>,
    ) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO uploads (kind, key, source_sha256, uploaded_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(kind, key) DO UPDATE SET
                  source_sha256 = excluded.source_sha256,
                  uploaded_at = excluded.uploaded_at
                ",
                params![kind.as_str(), key, source_sha256, now_utc_string()],
            )
            .with_context(|| format!("failed to record {} upload for {key}", kind.as_str()))?;
        Ok(())
    }

    pub fn record_failure(&self, kind: EntryKind, key: &str, message: &str) -> Result<()> {
        self.connection
            .execute(
                "INSERT INTO failures (kind, key, message, logged_at) VALUES (?1, ?2, ?3, ?4)",
                params![kind.as_str(), key, message, now_utc_string()],
            )
            .with_context(|| format!("failed to record {} failure for {key}", kind.as_str()))?;
        Ok(())
    }

    pub fn count_uploaded(&self, kind: EntryKind) -> Result<i64> {
        let count = self.connection.query_row(
            "SELECT COUNT(*) FROM uploads WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_failures(&self) -> Result<i64> {
        let count = self
            .connection
            .query_row("SELECT COUNT(*) FROM failures", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn recent_failures(&self, limit: usize) -> Result<Vec<FailureEntry>> {
        let mut statement = self.connection.prepare(
            "SELECT kind, key, message, logged_at FROM failures ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = statement.query_map(params![limit as i64], |row| {
            Ok(FailureEntry {
                kind: row.get(0)?,
                key: row.get(1)?,
                message: row.get(2)?,
                logged_at: row.get(3)?,
            })
        })?;

        let mut failures = Vec::new();
        for row in rows {
            failures.push(row?);
        }
        Ok(failures)
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS uploads (
              kind TEXT NOT NULL,
              key TEXT NOT NULL,
              source_sha256 TEXT,
              uploaded_at TEXT NOT NULL,
              PRIMARY KEY (kind, key)
            );

            CREATE TABLE IF NOT EXISTS failures (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              kind TEXT NOT NULL,
              key TEXT NOT NULL,
              message TEXT NOT NULL,
              logged_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_failures_key ON failures(kind, key);
            ",
        )
        .context("failed to create checkpoint schema")?;
    Ok(())
}
