//! Activity log - durable record of operational events in DuckDB
//!
//! Events (registrations, failed logins, approvals, downloads) are stored in
//! `activity.duckdb`, separate from the account database. Credentials and
//! session tokens are never written here.
//!
//! Recording is best-effort: `record` swallows storage failures after
//! emitting a tracing warning, so a broken log never fails a request.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use duckdb::Connection;
use serde::Serialize;
use tracing::warn;

use crate::adapters::duckdb::open_with_retry;
use crate::domain::result::{Error, Result};
use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::MigrationService;

pub const ACTIVITY_DB: &str = "activity.duckdb";

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = Utc::now().timestamp_millis().max(0) as u64;

    // Lower 16 bits hold the counter (65536 unique IDs per millisecond)
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Event names written by the services
pub mod events {
    pub const ACCOUNT_REGISTERED: &str = "account_registered";
    pub const ACCOUNT_SEEDED: &str = "account_seeded";
    pub const LOGIN_SUCCEEDED: &str = "login_succeeded";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const PROFILE_UPDATED: &str = "profile_updated";
    pub const ACCOUNT_APPROVED: &str = "account_approved";
    pub const ACCOUNT_DECLINED: &str = "account_declined";
    pub const DOWNLOAD_COMPLETED: &str = "download_completed";
    pub const DOWNLOAD_FAILED: &str = "download_failed";
    pub const DOWNLOAD_REMOVED: &str = "download_removed";
}

/// An event to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub event: String,
    pub account_id: Option<i64>,
    pub artifact_id: Option<String>,
    pub error_message: Option<String>,
}

impl ActivityEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            account_id: None,
            artifact_id: None,
            error_message: None,
        }
    }

    pub fn with_account(mut self, account_id: i64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn with_artifact(mut self, artifact_id: impl Into<String>) -> Self {
        self.artifact_id = Some(artifact_id.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// An event as stored in the database
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: u64,
    /// Unix milliseconds
    pub timestamp: i64,
    pub event: String,
    pub account_id: Option<i64>,
    pub artifact_id: Option<String>,
    pub error_message: Option<String>,
}

/// Append-only activity log
pub struct ActivityLog {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl ActivityLog {
    /// Open or create `activity.duckdb` in `data_dir` and migrate it
    pub fn new(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join(ACTIVITY_DB);
        let conn = open_with_retry(&db_path)?;
        MigrationService::new(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage("activity log lock poisoned"))
    }

    /// Store an event
    pub fn log(&self, event: ActivityEvent) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sys_activity (id, timestamp, event, account_id, artifact_id, error_message)
             VALUES (?, ?, ?, ?, ?, ?)",
            duckdb::params![
                generate_id(),
                now_ms(),
                &event.event,
                &event.account_id,
                &event.artifact_id,
                &event.error_message,
            ],
        )?;
        Ok(())
    }

    /// Store an event, warning instead of failing
    pub fn record(&self, event: ActivityEvent) {
        let name = event.event.clone();
        if let Err(e) = self.log(event) {
            warn!(event = %name, error = %e, "failed to write activity entry");
        }
    }

    /// Most recent entries first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        self.query(
            "SELECT id, timestamp, event, account_id, artifact_id, error_message
             FROM sys_activity
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
            limit,
        )
    }

    /// Most recent failures first
    pub fn get_errors(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        self.query(
            "SELECT id, timestamp, event, account_id, artifact_id, error_message
             FROM sys_activity
             WHERE error_message IS NOT NULL
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
            limit,
        )
    }

    fn query(&self, sql: &str, limit: usize) -> Result<Vec<ActivityEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(ActivityEntry {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                event: row.get(2)?,
                account_id: row.get(3)?,
                artifact_id: row.get(4)?,
                error_message: row.get(5)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM sys_activity", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete entries older than `timestamp_ms`
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_activity WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_activity_log_creation() {
        let dir = tempdir().unwrap();
        let log = ActivityLog::new(dir.path()).unwrap();
        assert!(log.db_path().exists());

        // Reopening runs no migrations twice
        drop(log);
        ActivityLog::new(dir.path()).unwrap();
    }

    #[test]
    fn test_log_with_context() {
        let dir = tempdir().unwrap();
        let log = ActivityLog::new(dir.path()).unwrap();

        log.log(
            ActivityEvent::new(events::DOWNLOAD_COMPLETED)
                .with_account(7)
                .with_artifact("g1"),
        )
        .unwrap();

        let entries = log.get_recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "download_completed");
        assert_eq!(entries[0].account_id, Some(7));
        assert_eq!(entries[0].artifact_id.as_deref(), Some("g1"));
        assert!(entries[0].error_message.is_none());
    }

    #[test]
    fn test_errors_filter() {
        let dir = tempdir().unwrap();
        let log = ActivityLog::new(dir.path()).unwrap();

        log.record(ActivityEvent::new(events::LOGIN_SUCCEEDED).with_account(1));
        log.record(
            ActivityEvent::new(events::DOWNLOAD_FAILED)
                .with_account(1)
                .with_artifact("g2")
                .with_error("Failed to download http://cdn/game-g2.zip: HTTP 404"),
        );

        let errors = log.get_errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "download_failed");
        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let dir = tempdir().unwrap();
        let log = ActivityLog::new(dir.path()).unwrap();

        for name in ["first", "second", "third"] {
            log.record(ActivityEvent::new(name));
        }

        let recent = log.get_recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event, "third");
        assert_eq!(recent[1].event, "second");
    }

    #[test]
    fn test_count_and_delete() {
        let dir = tempdir().unwrap();
        let log = ActivityLog::new(dir.path()).unwrap();

        log.record(ActivityEvent::new("event1"));
        log.record(ActivityEvent::new("event2"));
        assert_eq!(log.count().unwrap(), 2);

        let deleted = log.delete_before(now_ms() + 1000).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(log.count().unwrap(), 0);
    }
}
