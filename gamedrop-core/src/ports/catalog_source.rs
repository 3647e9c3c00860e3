//! Catalog source port - where artifact metadata comes from

use crate::domain::result::Result;
use crate::domain::{Catalog, CatalogEntry};

/// Remote artifact catalog
///
/// Implementations perform one fetch of the whole document per call. There is
/// no caching: every fulfillment sees the catalog as currently published.
pub trait CatalogSource: Send + Sync {
    /// Fetch and parse the full catalog document
    ///
    /// Transport, status, timeout and parse failures all surface as
    /// `Error::CatalogUnavailable`.
    fn fetch_catalog(&self) -> Result<Catalog>;

    /// Resolve a single artifact
    ///
    /// Fails with `Error::ArtifactNotFound` when the id is absent.
    fn resolve(&self, artifact_id: &str) -> Result<CatalogEntry> {
        self.fetch_catalog()?.entry(artifact_id)
    }
}
