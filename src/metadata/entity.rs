use serde::Deserialize;
use serde::Serialize;

/// Metadata collections the pipeline propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataKind {
    OrganisationUnit,
    OrganisationUnitGroup,
    OrganisationUnitGroupSet,
}

impl MetadataKind {
    pub const ALL: [MetadataKind; 3] = [
        MetadataKind::OrganisationUnit,
        MetadataKind::OrganisationUnitGroup,
        MetadataKind::OrganisationUnitGroupSet,
    ];

    /// REST collection name, as used in API paths and import payload keys.
    pub fn collection(&self) -> &'static str {
        match self {
            MetadataKind::OrganisationUnit => "organisationUnits",
            MetadataKind::OrganisationUnitGroup => "organisationUnitGroups",
            MetadataKind::OrganisationUnitGroupSet => "organisationUnitGroupSets",
        }
    }

    /// Type name reported by the deleted-object audit feed.
    pub fn klass(&self) -> &'static str {
        match self {
            MetadataKind::OrganisationUnit => "OrganisationUnit",
            MetadataKind::OrganisationUnitGroup => "OrganisationUnitGroup",
            MetadataKind::OrganisationUnitGroupSet => "OrganisationUnitGroupSet",
        }
    }

    pub fn from_collection(collection: &str) -> Option<Self> {
        MetadataKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.collection() == collection)
    }

    pub fn from_klass(klass: &str) -> Option<Self> {
        MetadataKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.klass() == klass)
    }
}

/// Reference to another entity by identifier, the shape collection
/// memberships are expressed in on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Point-in-time copy of one entity as captured from the primary.
///
/// Carries the fields needed to reproduce the entity downstream; replicas
/// fill in their own bookkeeping fields. Serializes to the camelCase wire
/// shape so it can be embedded directly in import payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub name: String,

    pub short_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_date: Option<String>,

    /// Group membership for organisation unit groups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organisation_units: Vec<EntityRef>,

    /// Group membership for organisation unit group sets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organisation_unit_groups: Vec<EntityRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}
