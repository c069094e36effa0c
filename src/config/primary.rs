use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Connection settings for the primary instance whose mutations are captured.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PrimaryConfig {
    #[serde(default = "default_primary_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// TCP connect timeout (unit: milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Full request deadline for a single poll page (unit: milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}
impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            base_url: default_primary_base_url(),
            username: String::new(),
            password: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl PrimaryConfig {
    /// Validates primary endpoint settings
    /// # Errors
    /// Returns `Error::Config` if any configuration rules are violated
    pub fn validate(&self) -> Result<()> {
        if reqwest::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::Message(format!(
                "primary.base_url is not a valid URL: {}",
                self.base_url
            ))
            .into());
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Message("primary.request_timeout_ms cannot be 0".into()).into());
        }

        Ok(())
    }
}

fn default_primary_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
