//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod accounts;
pub mod activity;
mod assembler;
mod credentials;
pub mod fulfillment;
mod ledger;
pub mod migration;

pub use accounts::AccountService;
pub use activity::{ActivityEntry, ActivityEvent, ActivityLog};
pub use assembler::ArchiveAssembler;
pub use credentials::CredentialHasher;
pub use fulfillment::{Fulfilled, FulfillmentService};
pub use ledger::DownloadLedger;
pub use migration::{MigrationResult, MigrationService};
