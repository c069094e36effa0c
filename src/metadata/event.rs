use serde::Deserialize;
use serde::Serialize;

use super::EntitySnapshot;
use super::MetadataKind;
use crate::Result;

/// Mutation classes a change event can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

impl ChangeOp {
    /// Single-letter form used in `allowed_ops` filters.
    pub fn symbol(&self) -> char {
        match self {
            ChangeOp::Create => 'c',
            ChangeOp::Update => 'u',
            ChangeOp::Delete => 'd',
        }
    }

    /// Lowercase name used as a metric label value.
    pub fn label(&self) -> &'static str {
        match self {
            ChangeOp::Create => "create",
            ChangeOp::Update => "update",
            ChangeOp::Delete => "delete",
        }
    }
}

/// Parsed `allowed_ops` filter ("c,u,d" and subsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedOps {
    create: bool,
    update: bool,
    delete: bool,
}

impl AllowedOps {
    /// Parse the comma-separated config form. Unknown symbols were already
    /// rejected by config validation, so they are ignored here.
    pub fn parse(raw: &str) -> Self {
        let mut ops = Self {
            create: false,
            update: false,
            delete: false,
        };
        for symbol in raw.split(',') {
            match symbol.trim() {
                "c" => ops.create = true,
                "u" => ops.update = true,
                "d" => ops.delete = true,
                _ => {}
            }
        }
        ops
    }

    pub fn allows(
        &self,
        op: ChangeOp,
    ) -> bool {
        match op {
            ChangeOp::Create => self.create,
            ChangeOp::Update => self.update,
            ChangeOp::Delete => self.delete,
        }
    }
}

/// One captured mutation flowing through the durable queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Queue position, assigned by the change log at append time
    pub sequence: u64,

    pub kind: MetadataKind,

    pub entity_id: String,

    pub op: ChangeOp,

    /// Entity state at capture time; `None` for deletes
    pub payload: Option<EntitySnapshot>,

    /// Local wall clock when the change was observed (epoch millis)
    pub captured_at_ms: u64,
}

impl ChangeEvent {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
