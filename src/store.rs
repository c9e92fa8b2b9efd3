use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::path::Path;
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::summary::Summary;

/// One finished session as stored in the history table
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub played_at: DateTime<Local>,
    pub times: Vec<u64>,
    pub average: u64,
    pub fastest: u64,
}

/// Local persistence for the personal best (lower is better) and history.
///
/// Implementations absorb their own failures: reads fall back to `None`/0 and
/// writes report `false`.
pub trait BestScoreStore {
    fn get_best(&self) -> Option<u64>;
    /// Persist `ms` only when it beats the stored best. Returns true if stored.
    fn set_best_if_lower(&self, ms: u64) -> bool;
    fn record_session(&self, times: &[u64], summary: &Summary) -> bool;
    fn session_count(&self) -> u64;
    /// Most recent sessions first
    fn recent_sessions(&self, limit: usize) -> Vec<SessionRecord>;
}

/// SQLite-backed store under the state directory
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the default database, creating directories and tables as needed
    pub fn open_default() -> Result<Self> {
        Self::open(AppDirs::db_path())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS best_reaction (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                ms INTEGER NOT NULL,
                achieved_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                played_at TEXT NOT NULL,
                times TEXT NOT NULL,
                average_ms INTEGER NOT NULL,
                fastest_ms INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_played_at ON sessions(played_at);
            "#,
        )?;
        Ok(Self { conn })
    }

    fn try_get_best(&self) -> Result<Option<u64>> {
        let best = self
            .conn
            .query_row("SELECT ms FROM best_reaction WHERE id = 1", [], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(best.map(|ms| ms.max(0) as u64))
    }

    fn try_set_best_if_lower(&self, ms: u64) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            INSERT INTO best_reaction (id, ms, achieved_at) VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET ms = excluded.ms, achieved_at = excluded.achieved_at
            WHERE excluded.ms < best_reaction.ms
            "#,
            params![ms as i64, Local::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    fn try_record_session(&self, times: &[u64], summary: &Summary) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sessions (played_at, times, average_ms, fastest_ms)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                Local::now().to_rfc3339(),
                serde_json::to_string(times)?,
                summary.average as i64,
                summary.fastest as i64,
            ],
        )?;
        Ok(())
    }

    fn try_recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT played_at, times, average_ms, fastest_ms
            FROM sessions
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let played_at: String = row.get(0)?;
            let times: String = row.get(1)?;
            Ok((
                played_at,
                times,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (played_at, times, average, fastest) = row?;
            let played_at = DateTime::parse_from_rfc3339(&played_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "played_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            records.push(SessionRecord {
                played_at,
                times: serde_json::from_str(&times)?,
                average: average.max(0) as u64,
                fastest: fastest.max(0) as u64,
            });
        }
        Ok(records)
    }
}

impl BestScoreStore for SqliteStore {
    fn get_best(&self) -> Option<u64> {
        self.try_get_best()
            .map_err(|e| warn!(error = %e, "failed to read best score"))
            .ok()
            .flatten()
    }

    fn set_best_if_lower(&self, ms: u64) -> bool {
        self.try_set_best_if_lower(ms)
            .map_err(|e| warn!(error = %e, "failed to save best score"))
            .unwrap_or(false)
    }

    fn record_session(&self, times: &[u64], summary: &Summary) -> bool {
        self.try_record_session(times, summary)
            .map_err(|e| warn!(error = %e, "failed to record session"))
            .is_ok()
    }

    fn session_count(&self) -> u64 {
        self.conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get::<_, i64>(0))
            .map(|n| n.max(0) as u64)
            .unwrap_or(0)
    }

    fn recent_sessions(&self, limit: usize) -> Vec<SessionRecord> {
        self.try_recent_sessions(limit)
            .map_err(|e| warn!(error = %e, "failed to read session history"))
            .unwrap_or_default()
    }
}

/// Throwaway store for tests and for runs where the database cannot open
#[derive(Debug, Default)]
pub struct MemoryStore {
    best: RefCell<Option<u64>>,
    sessions: RefCell<Vec<SessionRecord>>,
}

impl BestScoreStore for MemoryStore {
    fn get_best(&self) -> Option<u64> {
        *self.best.borrow()
    }

    fn set_best_if_lower(&self, ms: u64) -> bool {
        let mut best = self.best.borrow_mut();
        match *best {
            Some(current) if current <= ms => false,
            _ => {
                *best = Some(ms);
                true
            }
        }
    }

    fn record_session(&self, times: &[u64], summary: &Summary) -> bool {
        self.sessions.borrow_mut().push(SessionRecord {
            played_at: Local::now(),
            times: times.to_vec(),
            average: summary.average,
            fastest: summary.fastest,
        });
        true
    }

    fn session_count(&self) -> u64 {
        self.sessions.borrow().len() as u64
    }

    fn recent_sessions(&self, limit: usize) -> Vec<SessionRecord> {
        self.sessions.borrow().iter().rev().take(limit).cloned().collect()
    }
}
