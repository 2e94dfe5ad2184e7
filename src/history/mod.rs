//! # Run History
//!
//! Keeps a summary of recent runs in a SQLite database so regressions can be
//! spotted across invocations. Only the most recent runs are retained.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::error::Result;
use crate::testing::RunReport;

/// Maximum number of runs to retain.
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// A single recorded run.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

pub struct RunHistory {
    conn: Connection,
}

impl RunHistory {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               started_at TEXT NOT NULL,
               total INTEGER NOT NULL,
               passed INTEGER NOT NULL,
               failed INTEGER NOT NULL,
               skipped INTEGER NOT NULL,
               duration_ms INTEGER NOT NULL,
               report_json TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn })
    }

    /// Store `report`, evicting the oldest runs beyond the retention limit.
    pub fn record(&self, report: &RunReport) -> Result<i64> {
        let report_json = serde_json::to_string(report)?;
        self.conn.execute(
            "INSERT INTO runs (started_at, total, passed, failed, skipped, duration_ms, report_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                report.started_at.to_rfc3339(),
                report.total() as i64,
                report.passed() as i64,
                report.failed() as i64,
                report.skipped() as i64,
                report.duration_ms as i64,
                report_json,
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        self.conn.execute(
            "DELETE FROM runs WHERE id NOT IN (SELECT id FROM runs ORDER BY id DESC LIMIT ?1);",
            params![MAX_HISTORY_ENTRIES as i64],
        )?;

        tracing::debug!(run_id = id, "recorded run in history");
        Ok(id)
    }

    /// Most recent runs first.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, total, passed, failed, skipped, duration_ms
             FROM runs ORDER BY id DESC LIMIT ?1;",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let started_at: String = row.get(1)?;
            let started_at = DateTime::parse_from_rfc3339(&started_at)
                .map(|time| time.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
                })?;
            Ok(HistoryEntry {
                id: row.get(0)?,
                started_at,
                total: row.get::<_, i64>(2)? as usize,
                passed: row.get::<_, i64>(3)? as usize,
                failed: row.get::<_, i64>(4)? as usize,
                skipped: row.get::<_, i64>(5)? as usize,
                duration_ms: row.get::<_, i64>(6)? as u64,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Full JSON report of one run.
    pub fn report_json(&self, id: i64) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;

        Ok(self
            .conn
            .query_row(
                "SELECT report_json FROM runs WHERE id = ?1 LIMIT 1;",
                params![id],
                |row| row.get(0),
            )
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::report::{ScenarioReport, StepOutcome, StepReport};
    use crate::testing::{Failure, FailureKind, Severity};

    fn make_report(failed: bool) -> RunReport {
        let outcome = if failed {
            StepOutcome::Failed(Failure::new(FailureKind::Status, "expected status 201, got 403"))
        } else {
            StepOutcome::Passed
        };
        RunReport {
            started_at: Utc::now(),
            duration_ms: 12,
            scenarios: vec![ScenarioReport {
                scenario: "booking_lifecycle".into(),
                duration_ms: 12,
                steps: vec![StepReport {
                    id: "delete_booking".into(),
                    description: "Delete the booking".into(),
                    severity: Severity::Normal,
                    outcome,
                    duration_ms: 12,
                }],
            }],
        }
    }

    #[test]
    fn record_and_list() {
        let history = RunHistory::in_memory().unwrap();
        history.record(&make_report(false)).unwrap();
        let id = history.record(&make_report(true)).unwrap();

        let entries = history.recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].failed, 1);
        assert_eq!(entries[1].passed, 1);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let history = RunHistory::in_memory().unwrap();
        let mut last = 0;
        for _ in 0..MAX_HISTORY_ENTRIES + 5 {
            last = history.record(&make_report(false)).unwrap();
        }

        let entries = history.recent(1000).unwrap();
        assert_eq!(entries.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(entries[0].id, last);
    }

    #[test]
    fn stores_full_report_json() {
        let history = RunHistory::in_memory().unwrap();
        let id = history.record(&make_report(true)).unwrap();

        let json = history.report_json(id).unwrap().unwrap();
        assert!(json.contains("expected status 201, got 403"));
        assert!(history.report_json(id + 1).unwrap().is_none());
    }

    #[test]
    fn persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        RunHistory::open(&path).unwrap().record(&make_report(false)).unwrap();

        let reopened = RunHistory::open(&path).unwrap();
        assert_eq!(reopened.recent(5).unwrap().len(), 1);
    }
}
