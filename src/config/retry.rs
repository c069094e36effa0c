use serde::Deserialize;
use serde::Serialize;

/// Basic retry policy template
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct BackoffPolicy {
    /// Maximum number of attempts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Single operation timeout (unit: milliseconds)
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Divide strategies by pipeline stage
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryPolicies {
    // Replica delivery strategy (metadata import / delete requests)
    #[serde(default)]
    pub delivery: BackoffPolicy,

    // Change capture strategy (primary poll requests)
    #[serde(default)]
    pub capture: BackoffPolicy,

    // Health check strategy (high frequency detection)
    #[serde(default)]
    pub healthcheck: BackoffPolicy,
}

// Default value implementation
impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            delivery: BackoffPolicy {
                max_retries: 5,
                timeout_ms: 10_000,
                base_delay_ms: 200,
                max_delay_ms: 5000,
            },
            capture: BackoffPolicy {
                max_retries: 3,
                timeout_ms: 10_000,
                base_delay_ms: 500,
                max_delay_ms: 5000,
            },
            healthcheck: BackoffPolicy {
                max_retries: 3,
                timeout_ms: 1000,
                base_delay_ms: 1000,
                max_delay_ms: 10_000,
            },
        }
    }
}
fn default_max_retries() -> usize {
    3
}
fn default_op_timeout_ms() -> u64 {
    100
}
fn default_base_delay_ms() -> u64 {
    50
}
fn default_max_delay_ms() -> u64 {
    1000
}
