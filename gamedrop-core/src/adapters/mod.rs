//! Adapter implementations
//!
//! Adapters implement the port traits (and the stores the services own)
//! with concrete technologies:
//! - DuckDB for accounts and download history
//! - A locked JSON document for download counters
//! - reqwest for the CDN-hosted catalog and segments

pub mod cdn;
pub mod counter_file;
pub mod duckdb;

#[cfg(test)]
pub mod mock_cdn;
