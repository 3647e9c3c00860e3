//! DuckDB repository implementation
//!
//! Durable store for accounts and their download history. All access goes
//! through one `Mutex<Connection>`; every mutation is a single locked
//! statement or transaction, so check-then-act sequences cannot interleave.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection, OptionalExt};
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Tier, Transition};
use crate::migrations::MIGRATIONS;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str =
    "id, identity, contact_email, credential_hash, display_name, tier, created_at";

/// Check if an error message indicates a file locking issue that should be retried
pub(crate) fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Open a DuckDB file, retrying with exponential backoff while it is locked
pub(crate) fn open_with_retry(db_path: &Path) -> Result<Connection> {
    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        match try_open_connection(db_path) {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                let err_msg = e.to_string();
                if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    warn!(
                        path = %db_path.display(),
                        delay_ms = delay.as_millis() as u64,
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        error = %err_msg,
                        "database busy, retrying"
                    );
                    thread::sleep(delay);
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        Error::storage(format!("Failed to open database after {} retries", MAX_RETRIES))
    }))
}

fn try_open_connection(db_path: &Path) -> Result<Connection> {
    // Extension autoloading stays off; nothing here needs extensions
    let config = duckdb::Config::default().enable_autoload_extension(false)?;
    Ok(Connection::open_with_flags(db_path, config)?)
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the account database at `db_path`
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = open_with_retry(db_path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage("account store lock poisoned"))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn, MIGRATIONS).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            debug!(applied = ?result.applied, "applied account migrations");
        }
        Ok(())
    }

    // === Account operations ===

    /// Insert a new account
    ///
    /// Identity and email uniqueness are checked under the lock; a duplicate
    /// fails with `Error::Conflict` and nothing is written.
    pub fn create_account(
        &self,
        identity: &str,
        contact_email: &str,
        display_name: &str,
        credential_hash: &str,
        tier: Tier,
    ) -> Result<Account> {
        let conn = self.lock()?;
        Self::ensure_unique(&conn, identity, contact_email, None)?;

        let created_at = now_rfc3339();
        let id: i64 = conn.query_row(
            "INSERT INTO accounts (identity, contact_email, credential_hash, display_name, tier, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
            params![identity, contact_email, credential_hash, display_name, tier.as_i32(), created_at],
            |row| row.get(0),
        )?;

        Self::load_account(&conn, "id = ?", params![id])?
            .ok_or_else(|| Error::storage(format!("account {} vanished after insert", id)))
    }

    /// Insert an account unless one with the same identity already exists
    ///
    /// Returns true when a row was written.
    pub fn seed_account(
        &self,
        identity: &str,
        contact_email: &str,
        display_name: &str,
        credential_hash: &str,
        tier: Tier,
    ) -> Result<bool> {
        if self.get_account_by_identity(identity)?.is_some() {
            return Ok(false);
        }
        match self.create_account(identity, contact_email, display_name, credential_hash, tier) {
            Ok(_) => Ok(true),
            // Lost a race with a concurrent insert of the same identity
            Err(Error::Conflict(_)) if self.get_account_by_identity(identity)?.is_some() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn get_account_by_id(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Self::load_account(&conn, "id = ?", params![id])
    }

    pub fn get_account_by_identity(&self, identity: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Self::load_account(&conn, "identity = ?", params![identity])
    }

    pub fn get_account_by_email(&self, contact_email: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Self::load_account(&conn, "contact_email = ?", params![contact_email])
    }

    /// Accounts at `tier`, ordered by id
    pub fn list_accounts_by_tier(&self, tier: Tier) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE tier = ? ORDER BY id",
            ACCOUNT_COLUMNS
        ))?;
        let rows = stmt.query_map([tier.as_i32()], row_to_account)?;

        let mut accounts = Vec::new();
        for row in rows {
            let mut account = row??;
            account.downloads = Self::load_downloads(&conn, account.id)?;
            accounts.push(account);
        }
        Ok(accounts)
    }

    pub fn account_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?)
    }

    /// Apply a tier transition to a Pending account
    ///
    /// One conditional statement: the row must still be Pending when the
    /// write happens. Returns false when no Pending account with `id` exists.
    pub fn apply_transition(&self, id: i64, transition: Transition) -> Result<bool> {
        let mut conn = self.lock()?;
        let required = transition.required_tier().as_i32();

        match transition.target_tier() {
            Some(target) => {
                let changed = conn.execute(
                    "UPDATE accounts SET tier = ? WHERE id = ? AND tier = ?",
                    params![target.as_i32(), id, required],
                )?;
                Ok(changed > 0)
            }
            None => {
                let tx = conn.transaction()?;
                let removed = tx.execute(
                    "DELETE FROM accounts WHERE id = ? AND tier = ?",
                    params![id, required],
                )?;
                if removed > 0 {
                    tx.execute("DELETE FROM downloads WHERE account_id = ?", params![id])?;
                }
                tx.commit()?;
                Ok(removed > 0)
            }
        }
    }

    /// Update display name and/or email, returning the fresh snapshot
    pub fn update_profile(
        &self,
        id: i64,
        display_name: Option<&str>,
        contact_email: Option<&str>,
    ) -> Result<Account> {
        let conn = self.lock()?;
        let current = Self::load_account(&conn, "id = ?", params![id])?
            .ok_or_else(|| Error::not_found(format!("Account {} not found", id)))?;

        if let Some(name) = display_name {
            if name != current.display_name {
                conn.execute(
                    "UPDATE accounts SET display_name = ? WHERE id = ?",
                    params![name, id],
                )?;
            }
        }

        if let Some(email) = contact_email {
            if email != current.contact_email {
                Self::ensure_unique(&conn, "", email, Some(id))?;
                conn.execute(
                    "UPDATE accounts SET contact_email = ? WHERE id = ?",
                    params![email, id],
                )?;
            }
        }

        Self::load_account(&conn, "id = ?", params![id])?
            .ok_or_else(|| Error::not_found(format!("Account {} not found", id)))
    }

    // === Download history ===

    /// Insert-or-ignore a download record inside a transaction
    ///
    /// `on_recorded` runs after the insert and before the commit, and receives
    /// whether the record was new. If it fails, the transaction rolls back.
    /// Returns whether the record was new.
    pub fn record_download<F>(&self, account_id: i64, artifact_id: &str, on_recorded: F) -> Result<bool>
    where
        F: FnOnce(bool) -> Result<()>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM accounts WHERE id = ?",
            params![account_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(Error::not_found(format!("Account {} not found", account_id)));
        }

        let already: i64 = tx.query_row(
            "SELECT COUNT(*) FROM downloads WHERE account_id = ? AND artifact_id = ?",
            params![account_id, artifact_id],
            |row| row.get(0),
        )?;
        let is_new = already == 0;

        if is_new {
            tx.execute(
                "INSERT INTO downloads (account_id, artifact_id, downloaded_at) VALUES (?, ?, ?)",
                params![account_id, artifact_id, now_rfc3339()],
            )?;
        }

        on_recorded(is_new)?;
        tx.commit()?;
        Ok(is_new)
    }

    /// Remove a download record; returns whether one existed
    pub fn remove_download(&self, account_id: i64, artifact_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM downloads WHERE account_id = ? AND artifact_id = ?",
            params![account_id, artifact_id],
        )?;
        Ok(removed > 0)
    }

    /// Artifact ids downloaded by an account, in first-download order
    pub fn get_downloads(&self, account_id: i64) -> Result<Vec<String>> {
        let conn = self.lock()?;
        Self::load_downloads(&conn, account_id)
    }

    // === Helpers ===

    fn ensure_unique(conn: &Connection, identity: &str, contact_email: &str, except: Option<i64>) -> Result<()> {
        let except = except.unwrap_or(-1);

        if !identity.is_empty() {
            let taken: i64 = conn.query_row(
                "SELECT COUNT(*) FROM accounts WHERE identity = ? AND id <> ?",
                params![identity, except],
                |row| row.get(0),
            )?;
            if taken > 0 {
                return Err(Error::Conflict("Username already exists".to_string()));
            }
        }

        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE contact_email = ? AND id <> ?",
            params![contact_email, except],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(Error::Conflict("Email already exists".to_string()));
        }
        Ok(())
    }

    fn load_account(conn: &Connection, predicate: &str, args: &[&dyn duckdb::ToSql]) -> Result<Option<Account>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE {}",
            ACCOUNT_COLUMNS, predicate
        ))?;
        let account = stmt.query_row(args, row_to_account).optional()?;

        match account {
            Some(account) => {
                let mut account = account?;
                account.downloads = Self::load_downloads(conn, account.id)?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    fn load_downloads(conn: &Connection, account_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT artifact_id FROM downloads WHERE account_id = ? ORDER BY downloaded_at, rowid",
        )?;
        let rows = stmt.query_map([account_id], |row| row.get::<_, String>(0))?;

        let mut downloads = Vec::new();
        for row in rows {
            downloads.push(row?);
        }
        Ok(downloads)
    }
}

/// Map a row selected with `ACCOUNT_COLUMNS`
///
/// Downloads are loaded separately. An unknown tier value is a storage error
/// rather than a silent default.
fn row_to_account(row: &duckdb::Row) -> duckdb::Result<Result<Account>> {
    let tier_value: i32 = row.get(5)?;
    let created_str: String = row.get(6)?;

    let account = Tier::from_i32(tier_value)
        .ok_or_else(|| Error::storage(format!("unknown tier value {}", tier_value)))
        .map(|tier| Account {
            id: row.get(0).unwrap_or_default(),
            identity: row.get(1).unwrap_or_default(),
            contact_email: row.get(2).unwrap_or_default(),
            credential_hash: row.get(3).unwrap_or_default(),
            display_name: row.get(4).unwrap_or_default(),
            tier,
            downloads: Vec::new(),
            created_at: parse_timestamp(&created_str),
        });
    Ok(account)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, DuckDbRepository) {
        let dir = TempDir::new().unwrap();
        let repo = DuckDbRepository::new(&dir.path().join("gamedrop.duckdb")).unwrap();
        repo.ensure_schema().unwrap();
        (dir, repo)
    }

    fn add(repo: &DuckDbRepository, identity: &str, tier: Tier) -> Account {
        repo.create_account(
            identity,
            &format!("{}@example.com", identity),
            identity,
            "$argon2id$v=19$stub",
            tier,
        )
        .unwrap()
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error("IO Error: database is locked"));
        assert!(is_retryable_error("Resource temporarily unavailable"));
        assert!(!is_retryable_error("Catalog Error: table not found"));
    }

    #[test]
    fn test_create_and_lookup() {
        let (_dir, repo) = repo();
        let created = add(&repo, "ada", Tier::Pending);

        assert_eq!(created.tier, Tier::Pending);
        assert!(created.downloads.is_empty());

        let by_id = repo.get_account_by_id(created.id).unwrap().unwrap();
        assert_eq!(by_id.identity, "ada");
        assert_eq!(
            repo.get_account_by_email("ada@example.com").unwrap().unwrap().id,
            created.id
        );
        assert!(repo.get_account_by_identity("ADA").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_identity_or_email_conflicts() {
        let (_dir, repo) = repo();
        add(&repo, "ada", Tier::Pending);

        let err = repo
            .create_account("ada", "other@example.com", "Other", "h", Tier::Pending)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = repo
            .create_account("grace", "ada@example.com", "Grace", "h", Tier::Pending)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        assert_eq!(repo.account_count().unwrap(), 1);
    }

    #[test]
    fn test_seed_is_insert_if_absent() {
        let (_dir, repo) = repo();
        assert!(repo
            .seed_account("admin", "admin@example.com", "Admin", "h", Tier::Administrator)
            .unwrap());
        assert!(!repo
            .seed_account("admin", "admin2@example.com", "Admin", "h", Tier::Pending)
            .unwrap());

        let admin = repo.get_account_by_identity("admin").unwrap().unwrap();
        assert_eq!(admin.tier, Tier::Administrator);
    }

    #[test]
    fn test_approve_only_pending() {
        let (_dir, repo) = repo();
        let pending = add(&repo, "ada", Tier::Pending);
        let approved = add(&repo, "bob", Tier::Approved);

        assert!(repo.apply_transition(pending.id, Transition::Approve).unwrap());
        assert!(!repo.apply_transition(pending.id, Transition::Approve).unwrap());
        assert!(!repo.apply_transition(approved.id, Transition::Approve).unwrap());
        assert!(!repo.apply_transition(9999, Transition::Approve).unwrap());

        let reloaded = repo.get_account_by_id(pending.id).unwrap().unwrap();
        assert_eq!(reloaded.tier, Tier::Approved);
    }

    #[test]
    fn test_decline_deletes_pending_account() {
        let (_dir, repo) = repo();
        let pending = add(&repo, "ada", Tier::Pending);
        let admin = add(&repo, "root", Tier::Administrator);

        assert!(repo.apply_transition(pending.id, Transition::Decline).unwrap());
        assert!(repo.get_account_by_id(pending.id).unwrap().is_none());
        assert!(!repo.apply_transition(pending.id, Transition::Decline).unwrap());

        assert!(!repo.apply_transition(admin.id, Transition::Decline).unwrap());
        assert!(repo.get_account_by_id(admin.id).unwrap().is_some());
    }

    #[test]
    fn test_list_pending_ordered_by_id() {
        let (_dir, repo) = repo();
        let a = add(&repo, "ada", Tier::Pending);
        add(&repo, "bob", Tier::Approved);
        let c = add(&repo, "cy", Tier::Pending);

        let pending = repo.list_accounts_by_tier(Tier::Pending).unwrap();
        let ids: Vec<i64> = pending.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[test]
    fn test_record_download_is_idempotent() {
        let (_dir, repo) = repo();
        let ada = add(&repo, "ada", Tier::Approved);

        let mut seen = Vec::new();
        assert!(repo.record_download(ada.id, "g1", |new| {
            seen.push(new);
            Ok(())
        })
        .unwrap());
        assert!(!repo.record_download(ada.id, "g1", |new| {
            seen.push(new);
            Ok(())
        })
        .unwrap());
        repo.record_download(ada.id, "g2", |_| Ok(())).unwrap();

        assert_eq!(seen, vec![true, false]);
        assert_eq!(repo.get_downloads(ada.id).unwrap(), vec!["g1", "g2"]);
    }

    #[test]
    fn test_record_download_rolls_back_when_callback_fails() {
        let (_dir, repo) = repo();
        let ada = add(&repo, "ada", Tier::Approved);

        let err = repo
            .record_download(ada.id, "g1", |_| Err(Error::storage("counter write failed")))
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(repo.get_downloads(ada.id).unwrap().is_empty());
    }

    #[test]
    fn test_remove_download() {
        let (_dir, repo) = repo();
        let ada = add(&repo, "ada", Tier::Approved);
        repo.record_download(ada.id, "g1", |_| Ok(())).unwrap();

        assert!(repo.remove_download(ada.id, "g1").unwrap());
        assert!(!repo.remove_download(ada.id, "g1").unwrap());
        assert!(!repo.remove_download(ada.id, "never").unwrap());
        assert!(repo.get_downloads(ada.id).unwrap().is_empty());
    }

    #[test]
    fn test_update_profile() {
        let (_dir, repo) = repo();
        let ada = add(&repo, "ada", Tier::Approved);
        add(&repo, "bob", Tier::Approved);

        let updated = repo
            .update_profile(ada.id, Some("Ada Lovelace"), Some("ada@lovelace.dev"))
            .unwrap();
        assert_eq!(updated.display_name, "Ada Lovelace");
        assert_eq!(updated.contact_email, "ada@lovelace.dev");

        // Same email is a no-op, another account's email conflicts
        repo.update_profile(ada.id, None, Some("ada@lovelace.dev")).unwrap();
        let err = repo.update_profile(ada.id, None, Some("bob@example.com")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        assert!(matches!(
            repo.update_profile(424242, Some("x"), None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gamedrop.duckdb");
        let id = {
            let repo = DuckDbRepository::new(&path).unwrap();
            repo.ensure_schema().unwrap();
            let ada = add(&repo, "ada", Tier::Approved);
            repo.record_download(ada.id, "g1", |_| Ok(())).unwrap();
            ada.id
        };

        let repo = DuckDbRepository::new(&path).unwrap();
        repo.ensure_schema().unwrap();
        let ada = repo.get_account_by_id(id).unwrap().unwrap();
        assert_eq!(ada.downloads, vec!["g1"]);
    }
}
