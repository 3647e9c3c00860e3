//! Catalog and segment domain model

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::result::{Error, Result};

/// Catalog field holding the number of segments of an artifact
const SEGMENT_COUNT_FIELD: &str = "gameParts";

/// The remote catalog document: artifact id → descriptive metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Map<String, JsonValue>,
}

impl Catalog {
    /// Build a catalog from a parsed JSON document
    ///
    /// The document must be a JSON object; anything else means the remote
    /// side is serving something we cannot interpret.
    pub fn from_document(document: JsonValue) -> Result<Self> {
        match document {
            JsonValue::Object(entries) => Ok(Self { entries }),
            other => Err(Error::CatalogUnavailable(format!(
                "catalog document must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up one artifact
    pub fn entry(&self, artifact_id: &str) -> Result<CatalogEntry> {
        let raw = self
            .entries
            .get(artifact_id)
            .ok_or_else(|| Error::ArtifactNotFound(artifact_id.to_string()))?;
        CatalogEntry::from_json(artifact_id, raw)
    }

    /// The document as served, for clients that render the catalog
    pub fn to_document(&self) -> JsonValue {
        JsonValue::Object(self.entries.clone())
    }
}

/// One artifact as described by the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub artifact_id: String,
    /// Number of remote segments. Not validated here: the fulfillment path
    /// rejects values ≤ 0.
    pub segment_count: i64,
    pub metadata: Map<String, JsonValue>,
}

impl CatalogEntry {
    fn from_json(artifact_id: &str, raw: &JsonValue) -> Result<Self> {
        let metadata = match raw {
            JsonValue::Object(map) => map.clone(),
            other => {
                return Err(Error::InvalidCatalogEntry(format!(
                    "entry for {} must be an object, got {}",
                    artifact_id,
                    json_kind(other)
                )))
            }
        };

        let segment_count = match metadata.get(SEGMENT_COUNT_FIELD) {
            None | Some(JsonValue::Null) => 1,
            Some(value) => value.as_i64().ok_or_else(|| {
                Error::InvalidCatalogEntry(format!(
                    "{} of {} is not an integer: {}",
                    SEGMENT_COUNT_FIELD, artifact_id, value
                ))
            })?,
        };

        Ok(Self {
            artifact_id: artifact_id.to_string(),
            segment_count,
            metadata,
        })
    }

    /// Segment count as a usable positive number
    pub fn checked_segment_count(&self) -> Result<usize> {
        if self.segment_count <= 0 {
            return Err(Error::InvalidCatalogEntry(format!(
                "Invalid number of game parts for {}: {}",
                self.artifact_id, self.segment_count
            )));
        }
        usize::try_from(self.segment_count)
            .map_err(|_| Error::InvalidCatalogEntry(format!("segment count out of range: {}", self.segment_count)))
    }
}

/// Name of one remote segment of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLocator {
    pub artifact_id: String,
    /// Position in the final artifact, starting at 0
    pub ordinal: usize,
    pub file_name: String,
}

impl SegmentLocator {
    /// Ordered locators for an artifact split into `segment_count` pieces
    ///
    /// A single-segment artifact is stored unsuffixed as `game-{id}.zip`;
    /// otherwise the pieces are `game-{id}.zip.000`, `.001`, and so on.
    /// Locators are produced lazily, one per step.
    pub fn sequence(artifact_id: &str, segment_count: usize) -> impl Iterator<Item = SegmentLocator> + '_ {
        let base = archive_file_name(artifact_id);
        (0..segment_count).map(move |ordinal| SegmentLocator {
            artifact_id: artifact_id.to_string(),
            ordinal,
            file_name: if segment_count == 1 {
                base.clone()
            } else {
                format!("{}.{:03}", base, ordinal)
            },
        })
    }

    /// Absolute URL under the segment base URL
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.file_name)
    }
}

/// File name of the reassembled archive, also the single-segment remote name
pub fn archive_file_name(artifact_id: &str) -> String {
    format!("game-{}.zip", artifact_id)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
