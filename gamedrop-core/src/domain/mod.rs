//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod catalog;
mod credential;
pub mod permission;
pub mod result;

pub use account::{Account, AccountSummary, NewAccount, PendingRequest, ProfileUpdate, Tier};
pub use catalog::{Catalog, CatalogEntry, SegmentLocator};
pub use credential::Argon2Params;
pub use permission::Transition;
