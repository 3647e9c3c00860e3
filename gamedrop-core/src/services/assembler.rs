//! Archive assembler - ordered fetch and concatenation of segments

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::result::Result;
use crate::domain::SegmentLocator;
use crate::ports::SegmentSource;

pub struct ArchiveAssembler {
    segments: Arc<dyn SegmentSource>,
}

impl ArchiveAssembler {
    pub fn new(segments: Arc<dyn SegmentSource>) -> Self {
        Self { segments }
    }

    /// Fetch every segment of an artifact in order and concatenate them
    ///
    /// Stops at the first failure and discards whatever was buffered.
    pub fn assemble(&self, artifact_id: &str, segment_count: usize) -> Result<Vec<u8>> {
        let mut archive = Vec::new();

        for locator in SegmentLocator::sequence(artifact_id, segment_count) {
            match self.segments.fetch_segment(&locator) {
                Ok(bytes) => {
                    debug!(
                        artifact_id,
                        file = %locator.file_name,
                        len = bytes.len(),
                        "segment fetched"
                    );
                    archive.extend_from_slice(&bytes);
                }
                Err(e) => {
                    warn!(artifact_id, file = %locator.file_name, error = %e, "segment fetch failed");
                    return Err(e);
                }
            }
        }

        Ok(archive)
    }
}
