use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Delivery worker fan-out and the bounded consistency window.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct DeliveryConfig {
    /// Ordered partitions per target. Events for one entity always hash to
    /// the same partition, so raising this never reorders a single entity's
    /// history. Changing it on a live queue does, so drain first.
    #[serde(default = "default_partitions")]
    pub partitions: u32,

    /// Maximum events drained from the queue per worker wakeup
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Fallback wakeup interval when no append notification arrives
    /// (unit: milliseconds)
    #[serde(default = "default_worker_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bounded staleness promise: how long after capture a change may take
    /// to reach every reachable replica (unit: milliseconds)
    #[serde(default = "default_consistency_window_ms")]
    pub consistency_window_ms: u64,

    /// How long shutdown waits for in-flight deliveries (unit: milliseconds)
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,
}
impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            batch_limit: default_batch_limit(),
            poll_interval_ms: default_worker_poll_interval_ms(),
            consistency_window_ms: default_consistency_window_ms(),
            drain_grace_ms: default_drain_grace_ms(),
        }
    }
}

impl DeliveryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(ConfigError::Message("delivery.partitions cannot be 0".into()).into());
        }
        if self.batch_limit == 0 {
            return Err(ConfigError::Message("delivery.batch_limit cannot be 0".into()).into());
        }
        if self.consistency_window_ms == 0 {
            return Err(ConfigError::Message(
                "delivery.consistency_window_ms cannot be 0".into(),
            )
            .into());
        }
        Ok(())
    }
}

fn default_partitions() -> u32 {
    2
}
fn default_batch_limit() -> usize {
    64
}
fn default_worker_poll_interval_ms() -> u64 {
    500
}
fn default_consistency_window_ms() -> u64 {
    30_000
}
fn default_drain_grace_ms() -> u64 {
    5000
}
