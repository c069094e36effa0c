use serde::Deserialize;
use serde::Serialize;

use crate::metadata::ChangeOp;
use crate::metadata::MetadataKind;
use crate::Result;

/// Terminal failure record for one event on one target.
///
/// Keeps the `{error_message, body}` pairing operator tooling expects: the
/// payload that failed to apply is retained as JSON next to the failure
/// cause. The error text is credential-masked before it gets here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    pub sequence: u64,

    pub target: String,

    pub kind: MetadataKind,

    pub entity_id: String,

    pub op: ChangeOp,

    /// Human-readable failure cause with credentials masked
    pub error_message: String,

    /// JSON body that failed to apply, if the event carried one
    pub body: Option<String>,

    pub failed_at_ms: u64,
}

impl DeadLetterRecord {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
