use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Settings for the embedded metrics and status HTTP server.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct MonitoringConfig {
    #[serde(default = "default_prometheus_enabled")]
    pub prometheus_enabled: bool,

    /// Port serving `/metrics`, `/status` and `/reset`
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}
impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: default_prometheus_enabled(),
            prometheus_port: default_prometheus_port(),
        }
    }
}

impl MonitoringConfig {
    /// Validates monitoring configuration
    /// # Errors
    /// Returns `Error::Config` when:
    /// - Prometheus is enabled with invalid port
    /// - Port conflicts with well-known services
    pub fn validate(&self) -> Result<()> {
        if self.prometheus_enabled {
            // Validate port range
            if self.prometheus_port == 0 {
                return Err(
                    ConfigError::Message("prometheus_port cannot be 0 when enabled".into()).into(),
                );
            }

            // Check privileged ports (requires root)
            if self.prometheus_port < 1024 {
                return Err(ConfigError::Message(format!(
                    "prometheus_port {} is a privileged port (requires root)",
                    self.prometheus_port
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
fn default_prometheus_port() -> u16 {
    9600
}
