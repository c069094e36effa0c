use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Cadence and paging for the change capture poll loop.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct CaptureConfig {
    /// Poll interval against the primary (unit: milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Page size for collection listing requests
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}
impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            page_size: default_page_size(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Message("capture.poll_interval_ms cannot be 0".into()).into());
        }
        if self.page_size == 0 {
            return Err(ConfigError::Message("capture.page_size cannot be 0".into()).into());
        }
        Ok(())
    }
}

fn default_poll_interval_ms() -> u64 {
    5000
}
fn default_page_size() -> u32 {
    50
}
