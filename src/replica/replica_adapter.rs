use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::metadata::ChangeEvent;
use crate::Result;

/// How an accepted event landed on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The mutation is now reflected on the target
    Applied,

    /// The target already held the final state: a replayed CREATE with an
    /// identical payload, or a DELETE for an entity it never had
    AlreadyConverged,

    /// The event's operation is outside the target's `allowed_ops` set;
    /// acknowledged without a network call
    Filtered,
}

/// Write side of propagation: translates one captured change into the
/// target's native create/update/delete call.
///
/// Implementations classify failures through [`crate::DeliveryError`]:
/// `Transient` keeps the event in place for another attempt, everything
/// else is terminal for this (event, target) pair.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReplicaAdapter: Send + Sync + 'static {
    /// Stable target name, used in cursor keys, logs and metric labels.
    fn target_name(&self) -> &str;

    /// Applies one event. Must be idempotent: re-applying a delivered event
    /// reports [`ApplyOutcome::AlreadyConverged`] rather than an error.
    async fn apply(
        &self,
        event: &ChangeEvent,
    ) -> Result<ApplyOutcome>;

    /// Cheap liveness probe against the target's system endpoint.
    async fn check_health(&self) -> Result<()>;
}
