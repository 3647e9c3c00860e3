//! Segment source port - fetches one remote piece of an artifact

use crate::domain::result::Result;
use crate::domain::SegmentLocator;

/// Remote segment storage
///
/// Stateless and fail-fast: one attempt per call, no retries. Any failure is
/// reported as `Error::SegmentFetchFailed` naming the URL that failed.
pub trait SegmentSource: Send + Sync {
    fn fetch_segment(&self, locator: &SegmentLocator) -> Result<Vec<u8>>;
}
