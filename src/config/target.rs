use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// One downstream replica receiving propagated changes.
///
/// Declared as repeated `[[targets]]` blocks in the config file. Fields left
/// out fall back to per-target defaults, so a minimal block only carries
/// `base_url` and credentials.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TargetConfig {
    /// Stable identifier used in cursor keys, log fields and metric labels.
    /// Derived from `base_url` host and port when empty. Renaming a target
    /// abandons its delivery cursor, so pick names deliberately.
    #[serde(default)]
    pub name: String,

    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Identifier scheme replicas are addressed with
    #[serde(default = "default_id_scheme")]
    pub id_scheme: String,

    /// Comma-separated subset of "c,u,d" this target accepts
    #[serde(default = "default_allowed_ops")]
    pub allowed_ops: String,

    /// Full request deadline for a single delivery attempt (unit: milliseconds)
    #[serde(default = "default_target_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl TargetConfig {
    /// Resolved target name: the configured one, or `host:port` of `base_url`.
    pub fn effective_name(&self) -> Result<String> {
        if !self.name.is_empty() {
            return Ok(self.name.clone());
        }

        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Message(format!("target base_url is not a valid URL: {e}"))
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::Message("target base_url has no host".into()))?;
        match url.port_or_known_default() {
            Some(port) => Ok(format!("{host}:{port}")),
            None => Ok(host.to_string()),
        }
    }

    /// Validates a single target block
    /// # Errors
    /// Returns `Error::Config` if any configuration rules are violated
    pub fn validate(&self) -> Result<()> {
        if reqwest::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::Message(format!(
                "target base_url is not a valid URL: {}",
                self.base_url
            ))
            .into());
        }

        for op in self.allowed_ops.split(',') {
            let op = op.trim();
            if !matches!(op, "c" | "u" | "d") {
                return Err(ConfigError::Message(format!(
                    "allowed_ops for target {} contains unknown operation {op:?} (expected c, u or d)",
                    self.effective_name()?
                ))
                .into());
            }
        }

        if self.id_scheme != "uid" && self.id_scheme != "code" {
            return Err(ConfigError::Message(format!(
                "id_scheme for target {} must be \"uid\" or \"code\", got {:?}",
                self.effective_name()?,
                self.id_scheme
            ))
            .into());
        }

        if self.request_timeout_ms == 0 {
            return Err(
                ConfigError::Message("target request_timeout_ms cannot be 0".into()).into(),
            );
        }

        Ok(())
    }
}

pub(crate) fn default_id_scheme() -> String {
    "uid".to_string()
}
pub(crate) fn default_allowed_ops() -> String {
    "c,u,d".to_string()
}
fn default_target_request_timeout_ms() -> u64 {
    10_000
}
