use crate::metadata::ChangeEvent;
use crate::metadata::ChangeOp;
use crate::metadata::EntitySnapshot;
use crate::metadata::MetadataKind;

/// Builds capture-shaped change events for tests. Sequences are left at
/// zero; the change log assigns them at append time.
pub struct EventBuilder {
    kind: MetadataKind,
    captured_at_ms: u64,
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBuilder {
    pub fn new() -> Self {
        Self {
            kind: MetadataKind::OrganisationUnit,
            captured_at_ms: 1_700_000_000_000,
        }
    }

    pub fn kind(
        mut self,
        kind: MetadataKind,
    ) -> Self {
        self.kind = kind;
        self
    }

    pub fn captured_at_ms(
        mut self,
        captured_at_ms: u64,
    ) -> Self {
        self.captured_at_ms = captured_at_ms;
        self
    }

    pub fn create(
        &self,
        id: &str,
    ) -> ChangeEvent {
        self.op(id, ChangeOp::Create)
    }

    pub fn update(
        &self,
        id: &str,
    ) -> ChangeEvent {
        self.op(id, ChangeOp::Update)
    }

    pub fn delete(
        &self,
        id: &str,
    ) -> ChangeEvent {
        self.op(id, ChangeOp::Delete)
    }

    pub fn op(
        &self,
        id: &str,
        op: ChangeOp,
    ) -> ChangeEvent {
        ChangeEvent {
            sequence: 0,
            kind: self.kind,
            entity_id: id.to_string(),
            op,
            payload: (op != ChangeOp::Delete).then(|| snapshot_of(id)),
            captured_at_ms: self.captured_at_ms,
        }
    }
}

/// Minimal well-formed snapshot for one entity id.
pub fn snapshot_of(id: &str) -> EntitySnapshot {
    EntitySnapshot {
        id: id.to_string(),
        code: None,
        name: format!("Entity {id}"),
        short_name: id.to_string(),
        opening_date: Some("1970-01-01T00:00:00.000".to_string()),
        organisation_units: vec![],
        organisation_unit_groups: vec![],
        created: None,
        last_updated: Some("2024-03-01T08:00:00.000".to_string()),
    }
}
