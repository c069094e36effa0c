use serde::Deserialize;
use serde::Serialize;

use crate::metadata::MetadataKind;
use crate::Result;

/// Capture frontier persisted alongside the queue.
///
/// Timestamps are the primary's own ISO-8601 strings and compare
/// lexicographically. Polls filter with `ge` rather than `gt`, so entities
/// sharing the frontier millisecond are re-observed; the `*_seen` lists
/// remember which of those were already emitted so a poll cannot duplicate
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureBookmark {
    /// Highest lastUpdated value already captured
    pub updated_frontier: Option<String>,

    /// "collection/id" keys emitted at exactly `updated_frontier`
    pub updated_seen: Vec<String>,

    /// Highest deletedAt value already captured
    pub deleted_frontier: Option<String>,

    /// "collection/id" keys emitted at exactly `deleted_frontier`
    pub deleted_seen: Vec<String>,
}

impl CaptureBookmark {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Composite dedupe key for one entity in one collection.
    pub fn seen_key(
        kind: MetadataKind,
        id: &str,
    ) -> String {
        format!("{}/{}", kind.collection(), id)
    }
}
