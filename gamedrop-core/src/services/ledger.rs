//! Download ledger - per-account download history plus global counters

use std::sync::Arc;

use tracing::{debug, error};

use crate::adapters::counter_file::{CounterDocument, Counters};
use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};

pub struct DownloadLedger {
    repository: Arc<DuckDbRepository>,
    counters: Arc<CounterDocument>,
}

impl DownloadLedger {
    pub fn new(repository: Arc<DuckDbRepository>, counters: Arc<CounterDocument>) -> Self {
        Self { repository, counters }
    }

    /// Record a completed download
    ///
    /// The per-account record is insert-or-ignore. The artifact counter is
    /// incremented on every call, repeat downloads included. The history row
    /// commits only after the counter was written; if that commit fails the
    /// increment is taken back. Returns whether the history entry was new.
    pub fn record_download(&self, account_id: i64, artifact_id: &str) -> Result<bool> {
        let mut incremented = false;

        let result = self.repository.record_download(account_id, artifact_id, |_| {
            self.counters.mutate(|counters| {
                *counters.entry(artifact_id.to_string()).or_insert(0) += 1;
                Ok(())
            })?;
            incremented = true;
            Ok(())
        });

        match result {
            Ok(is_new) => {
                debug!(account_id, artifact_id, is_new, "download recorded");
                Ok(is_new)
            }
            Err(e) => {
                if incremented {
                    self.compensate(artifact_id);
                }
                Err(e)
            }
        }
    }

    fn compensate(&self, artifact_id: &str) {
        let undone = self.counters.mutate(|counters| {
            if let Some(count) = counters.get_mut(artifact_id) {
                *count = count.saturating_sub(1);
            }
            Ok(())
        });
        if let Err(e) = undone {
            error!(artifact_id, error = %e, "failed to roll back download counter");
        }
    }

    /// Drop an artifact from an account's history; the counter is untouched
    pub fn remove_download(&self, account_id: i64, artifact_id: &str) -> Result<()> {
        if artifact_id.trim().is_empty() {
            return Err(Error::validation("Missing gameId"));
        }
        let removed = self.repository.remove_download(account_id, artifact_id)?;
        debug!(account_id, artifact_id, removed, "download removed");
        Ok(())
    }

    /// Snapshot of all artifact counters
    pub fn counters(&self) -> Result<Counters> {
        self.counters.snapshot()
    }

    /// Artifact ids downloaded by an account, oldest first
    pub fn downloads(&self, account_id: i64) -> Result<Vec<String>> {
        self.repository.get_downloads(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tier;
    use tempfile::TempDir;

    fn ledger() -> (TempDir, DownloadLedger, i64) {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("gamedrop.duckdb")).unwrap());
        repo.ensure_schema().unwrap();
        let account = repo
            .create_account("ada", "ada@example.com", "Ada", "h", Tier::Approved)
            .unwrap();
        let counters = Arc::new(CounterDocument::new(dir.path()));
        (dir, DownloadLedger::new(repo, counters), account.id)
    }

    #[test]
    fn test_repeat_download_keeps_one_entry_but_counts_twice() {
        let (_dir, ledger, id) = ledger();

        assert!(ledger.record_download(id, "g1").unwrap());
        assert!(!ledger.record_download(id, "g1").unwrap());

        assert_eq!(ledger.downloads(id).unwrap(), vec!["g1"]);
        assert_eq!(ledger.counters().unwrap().get("g1"), Some(&2));
    }

    #[test]
    fn test_remove_does_not_touch_counter() {
        let (_dir, ledger, id) = ledger();
        ledger.record_download(id, "g1").unwrap();

        ledger.remove_download(id, "g1").unwrap();
        ledger.remove_download(id, "g1").unwrap();
        ledger.remove_download(id, "never-downloaded").unwrap();

        assert!(ledger.downloads(id).unwrap().is_empty());
        assert_eq!(ledger.counters().unwrap().get("g1"), Some(&1));
    }

    #[test]
    fn test_remove_requires_artifact_id() {
        let (_dir, ledger, id) = ledger();
        assert!(matches!(ledger.remove_download(id, "  "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_remove_matches_id_exactly() {
        let (_dir, ledger, id) = ledger();
        ledger.record_download(id, "g1").unwrap();

        ledger.remove_download(id, " g1 ").unwrap();
        assert_eq!(ledger.downloads(id).unwrap(), vec!["g1"]);
    }

    #[test]
    fn test_unknown_account_changes_nothing() {
        let (_dir, ledger, _id) = ledger();
        assert!(matches!(ledger.record_download(9999, "g1"), Err(Error::NotFound(_))));
        assert!(ledger.counters().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_counter_document_rolls_back_history() {
        let (dir, ledger, id) = ledger();
        std::fs::write(dir.path().join("downloadCounts.json"), "[broken").unwrap();

        assert!(matches!(ledger.record_download(id, "g1"), Err(Error::Storage(_))));
        assert!(ledger.downloads(id).unwrap().is_empty());
    }
}
