//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod catalog_source;
mod segment_source;

pub use catalog_source::CatalogSource;
pub use segment_source::SegmentSource;
