use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;

use crate::metadata::EntitySnapshot;
use crate::metadata::MetadataKind;
use crate::Result;

/// Record from the primary's deleted-object audit feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedRecord {
    pub uid: String,
    pub klass: String,
    pub deleted_at: String,
}

/// Read side of change capture: answers "what changed since this frontier".
///
/// Both calls treat `since` inclusively (`ge` comparison), so callers are
/// expected to dedupe entities sitting exactly on the frontier.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChangeSource: Send + Sync + 'static {
    /// Entities of `kind` whose lastUpdated is at or after `since`.
    async fn fetch_updated(
        &self,
        kind: MetadataKind,
        since: Option<String>,
    ) -> Result<Vec<EntitySnapshot>>;

    /// Deletion audit records of `kind` deleted at or after `since`.
    async fn fetch_deleted(
        &self,
        kind: MetadataKind,
        since: Option<String>,
    ) -> Result<Vec<DeletedRecord>>;
}
