use std::time::Duration;

use async_trait::async_trait;
use autometrics::autometrics;
use serde_json::json;
use tracing::debug;
use tracing::warn;

use crate::config::TargetConfig;
use crate::metadata::AllowedOps;
use crate::metadata::ChangeEvent;
use crate::metadata::ChangeOp;
use crate::metadata::EntitySnapshot;
use crate::metadata::MetadataKind;
use crate::replica::ApplyOutcome;
use crate::replica::ReplicaAdapter;
use crate::DeliveryError;
use crate::NetworkError;
use crate::Result;
use crate::API_SLO;

/// [`ReplicaAdapter`] over a target's REST API.
///
/// Creates and updates go through the bulk metadata import with the
/// `CREATE_AND_UPDATE` strategy, which is an upsert: replaying a CREATE the
/// target already holds succeeds with the same 200 as the first delivery.
/// Deletes address the entity resource directly.
pub struct RestAdapter {
    name: String,
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    id_scheme: String,
    allowed_ops: AllowedOps,
}

impl RestAdapter {
    pub fn new(config: &TargetConfig) -> Result<Self> {
        let name = config.effective_name()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            name,
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            id_scheme: config.id_scheme.clone(),
            allowed_ops: AllowedOps::parse(&config.allowed_ops),
        })
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(&self.password))
        }
    }

    async fn upsert(
        &self,
        op: ChangeOp,
        kind: MetadataKind,
        entity_id: &str,
        snapshot: &EntitySnapshot,
    ) -> Result<ApplyOutcome> {
        let url = format!("{}/api/metadata", self.base_url);
        let body = json!({ kind.collection(): [snapshot] });

        let response = self
            .authorized(self.client.post(&url))
            .query(&[
                ("importStrategy", "CREATE_AND_UPDATE"),
                ("idScheme", self.id_scheme.as_str()),
            ])
            .json(&body)
            .send()
            .await?;

        classify_status(&self.name, op, entity_id, response.status().as_u16())
    }

    async fn delete(
        &self,
        kind: MetadataKind,
        entity_id: &str,
    ) -> Result<ApplyOutcome> {
        let url = format!("{}/api/{}/{}", self.base_url, kind.collection(), entity_id);

        let response = self.authorized(self.client.delete(&url)).send().await?;
        classify_status(&self.name, ChangeOp::Delete, entity_id, response.status().as_u16())
    }
}

#[async_trait]
impl ReplicaAdapter for RestAdapter {
    fn target_name(&self) -> &str {
        &self.name
    }

    #[autometrics(objective = API_SLO)]
    async fn apply(
        &self,
        event: &ChangeEvent,
    ) -> Result<ApplyOutcome> {
        if !self.allowed_ops.allows(event.op) {
            debug!(
                target = %self.name,
                entity_id = %event.entity_id,
                op = event.op.label(),
                "operation filtered by allowed_ops"
            );
            return Ok(ApplyOutcome::Filtered);
        }

        match (event.op, &event.payload) {
            (ChangeOp::Delete, _) => self.delete(event.kind, &event.entity_id).await,
            (op, Some(snapshot)) => self.upsert(op, event.kind, &event.entity_id, snapshot).await,
            (_, None) => {
                warn!(
                    target = %self.name,
                    sequence = event.sequence,
                    "write event without payload snapshot"
                );
                Err(DeliveryError::Undeliverable {
                    target: self.name.clone(),
                    sequence: event.sequence,
                    reason: "write event carries no payload snapshot".to_string(),
                }
                .into())
            }
        }
    }

    #[autometrics(objective = API_SLO)]
    async fn check_health(&self) -> Result<()> {
        let url = format!("{}/api/system/info", self.base_url);
        let response = self.authorized(self.client.get(&url)).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NetworkError::ServiceUnavailable(format!(
                "{} returned {}",
                url,
                response.status()
            ))
            .into())
        }
    }
}

/// Maps a target's HTTP status to an outcome or a classified failure.
///
/// 404 on DELETE means the entity is already gone, which is exactly the
/// converged state. 409 is a conflicting-state signal and is surfaced as
/// its own kind rather than overwritten. 408/429 and all 5xx are worth
/// retrying; the remaining 4xx are not.
pub(crate) fn classify_status(
    target: &str,
    op: ChangeOp,
    entity_id: &str,
    status: u16,
) -> Result<ApplyOutcome> {
    match status {
        200..=299 => Ok(ApplyOutcome::Applied),
        404 if op == ChangeOp::Delete => Ok(ApplyOutcome::AlreadyConverged),
        409 => Err(DeliveryError::Conflict {
            target: target.to_string(),
            entity_id: entity_id.to_string(),
        }
        .into()),
        408 | 429 => Err(DeliveryError::Transient {
            target: target.to_string(),
            reason: format!("status {status}"),
        }
        .into()),
        400..=499 => Err(DeliveryError::Rejected {
            target: target.to_string(),
            status,
        }
        .into()),
        _ => Err(DeliveryError::Transient {
            target: target.to_string(),
            reason: format!("status {status}"),
        }
        .into()),
    }
}
