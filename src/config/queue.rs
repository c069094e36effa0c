use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Sizing and maintenance of the durable change queue.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct QueueConfig {
    /// Capture pauses (and resumes later) once this many events are retained.
    /// Not a hard cap: a batch already in flight still lands.
    #[serde(default = "default_soft_capacity")]
    pub soft_capacity: u64,

    /// How often fully-delivered events are purged (unit: milliseconds)
    #[serde(default = "default_compaction_interval_ms")]
    pub compaction_interval_ms: u64,
}
impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            soft_capacity: default_soft_capacity(),
            compaction_interval_ms: default_compaction_interval_ms(),
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Result<()> {
        if self.soft_capacity == 0 {
            return Err(ConfigError::Message("queue.soft_capacity cannot be 0".into()).into());
        }
        if self.compaction_interval_ms == 0 {
            return Err(
                ConfigError::Message("queue.compaction_interval_ms cannot be 0".into()).into(),
            );
        }
        Ok(())
    }
}

fn default_soft_capacity() -> u64 {
    100_000
}
fn default_compaction_interval_ms() -> u64 {
    30_000
}
