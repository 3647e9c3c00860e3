//! Gamedrop Core - Business logic for gated artifact downloads
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Tier, CatalogEntry, etc.)
//! - **ports**: Trait definitions for external dependencies (CatalogSource, SegmentSource)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, counter document, CDN clients)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use adapters::cdn::{HttpCatalogClient, HttpSegmentSource};
use adapters::counter_file::CounterDocument;
use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::{CatalogSource, SegmentSource};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{Account, AccountSummary, NewAccount, PendingRequest, ProfileUpdate, Tier};

pub const ACCOUNTS_DB: &str = "gamedrop.duckdb";

/// Main context for Gamedrop operations
///
/// This is the primary entry point for all business logic. It holds the
/// stores, configuration, and all services.
pub struct GamedropContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub activity: Arc<ActivityLog>,
    pub accounts: AccountService,
    pub ledger: Arc<DownloadLedger>,
    pub fulfillment: FulfillmentService,
}

impl GamedropContext {
    /// Create a context with CDN clients built from `settings.json`
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;

        let catalog = HttpCatalogClient::new(&config.catalog_url, config.fetch_timeout)?;
        let segments = HttpSegmentSource::new(&config.segment_base_url, config.fetch_timeout)?;

        Self::with_sources(data_dir, config, Arc::new(catalog), Arc::new(segments))
    }

    /// Create a context over explicit catalog and segment sources
    pub fn with_sources(
        data_dir: &Path,
        config: Config,
        catalog: Arc<dyn CatalogSource>,
        segments: Arc<dyn SegmentSource>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let repository = Arc::new(
            DuckDbRepository::new(&data_dir.join(ACCOUNTS_DB)).context("Failed to open account database")?,
        );
        repository.ensure_schema().context("Failed to migrate account database")?;

        let activity = Arc::new(ActivityLog::new(data_dir).context("Failed to open activity log")?);
        let counters = Arc::new(CounterDocument::new(data_dir));

        let accounts = AccountService::new(
            Arc::clone(&repository),
            CredentialHasher::new(config.argon2.clone()),
            Arc::clone(&activity),
        );
        let seeded = accounts
            .seed(&config.seed_accounts)
            .context("Failed to seed accounts")?;
        if seeded > 0 {
            info!(seeded, "created seed accounts");
        }

        let ledger = Arc::new(DownloadLedger::new(Arc::clone(&repository), counters));
        let fulfillment = FulfillmentService::new(
            Arc::clone(&repository),
            catalog,
            ArchiveAssembler::new(segments),
            Arc::clone(&ledger),
            Arc::clone(&activity),
        );

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            activity,
            accounts,
            ledger,
            fulfillment,
        })
    }
}
