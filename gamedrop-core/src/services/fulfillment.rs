//! Fulfillment service - the download pipeline
//!
//! `fulfill` runs, in order: input validation, permission check, catalog
//! resolution, segment count validation, assembly, ledger update. Everything
//! before assembly is local or a single catalog fetch, so a rejected request
//! never touches the segment store. The ledger is only written once the whole
//! archive is in memory.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::catalog::archive_file_name;
use crate::domain::permission;
use crate::domain::result::{Error, Result};
use crate::domain::Catalog;
use crate::ports::CatalogSource;
use crate::services::activity::{events, ActivityEvent, ActivityLog};
use crate::services::{ArchiveAssembler, DownloadLedger};

pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// An assembled archive ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfilled {
    pub artifact_id: String,
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct FulfillmentService {
    repository: Arc<DuckDbRepository>,
    catalog: Arc<dyn CatalogSource>,
    assembler: ArchiveAssembler,
    ledger: Arc<DownloadLedger>,
    activity: Arc<ActivityLog>,
}

impl FulfillmentService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        catalog: Arc<dyn CatalogSource>,
        assembler: ArchiveAssembler,
        ledger: Arc<DownloadLedger>,
        activity: Arc<ActivityLog>,
    ) -> Self {
        Self {
            repository,
            catalog,
            assembler,
            ledger,
            activity,
        }
    }

    /// Build the archive for `artifact_id` on behalf of `caller_id`
    ///
    /// The caller is re-read from the store so tier changes apply at once.
    pub fn fulfill(&self, caller_id: i64, artifact_id: &str) -> Result<Fulfilled> {
        // Blank ids are rejected; any other id is looked up exactly as given
        if artifact_id.trim().is_empty() {
            return Err(Error::validation("Missing game ID"));
        }

        let caller = self
            .repository
            .get_account_by_id(caller_id)?
            .ok_or_else(|| Error::Authentication("Login required".to_string()))?;
        if !permission::can_download(&caller) {
            return Err(Error::forbidden("Insufficient permissions"));
        }

        match self.build(artifact_id) {
            Ok(bytes) => {
                self.ledger.record_download(caller.id, artifact_id)?;
                info!(account_id = caller.id, artifact_id, len = bytes.len(), "download fulfilled");
                self.activity.record(
                    ActivityEvent::new(events::DOWNLOAD_COMPLETED)
                        .with_account(caller.id)
                        .with_artifact(artifact_id),
                );
                Ok(Fulfilled {
                    artifact_id: artifact_id.to_string(),
                    file_name: archive_file_name(artifact_id),
                    content_type: ARCHIVE_CONTENT_TYPE,
                    bytes,
                })
            }
            Err(e) => {
                warn!(account_id = caller.id, artifact_id, error = %e, "download failed");
                self.activity.record(
                    ActivityEvent::new(events::DOWNLOAD_FAILED)
                        .with_account(caller.id)
                        .with_artifact(artifact_id)
                        .with_error(e.to_string()),
                );
                Err(e)
            }
        }
    }

    fn build(&self, artifact_id: &str) -> Result<Vec<u8>> {
        let entry = self.catalog.resolve(artifact_id)?;
        let segment_count = entry.checked_segment_count()?;
        self.assembler.assemble(artifact_id, segment_count)
    }

    /// The current catalog, fetched fresh
    pub fn catalog(&self) -> Result<Catalog> {
        self.catalog.fetch_catalog()
    }

    /// Remove an artifact from the caller's history
    pub fn remove_download(&self, caller_id: i64, artifact_id: &str) -> Result<()> {
        self.ledger.remove_download(caller_id, artifact_id)?;
        self.activity.record(
            ActivityEvent::new(events::DOWNLOAD_REMOVED)
                .with_account(caller_id)
                .with_artifact(artifact_id),
        );
        Ok(())
    }
}
