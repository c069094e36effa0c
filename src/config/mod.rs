//! Configuration management module for the synchronization node.
//!
//! Provides hierarchical configuration loading from multiple sources with priority:
//! 1. Default values (hardcoded)
//! 2. Base config file (`config/metasync`)
//! 3. Node-specific config file (CLI argument)
//! 4. `CONFIG_PATH` overlay
//! 5. Local overrides (`config/local`)
//! 6. Environment variables (highest priority, `METASYNC__` prefix)

mod capture;
mod delivery;
mod monitoring;
mod node;
mod primary;
mod queue;
mod retry;
mod target;
pub use capture::*;
pub use delivery::*;
pub use monitoring::*;
pub use node::*;
pub use primary::*;
pub use queue::*;
pub use retry::*;
pub use target::*;


//---
use std::env;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncNodeConfig {
    /// Node identity and local storage paths
    #[serde(default)]
    pub node: NodeConfig,
    /// Primary instance the capture stage polls
    #[serde(default)]
    pub primary: PrimaryConfig,
    /// Replica targets receiving propagated changes
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    /// Change capture cadence and paging
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Durable queue sizing and compaction
    #[serde(default)]
    pub queue: QueueConfig,
    /// Delivery worker fan-out and consistency window
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Retry policies for pipeline operations
    #[serde(default)]
    pub retry: RetryPolicies,
    /// Metrics and status endpoint settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Default for SyncNodeConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            primary: PrimaryConfig::default(),
            targets: vec![],
            capture: CaptureConfig::default(),
            queue: QueueConfig::default(),
            delivery: DeliveryConfig::default(),
            retry: RetryPolicies::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl SyncNodeConfig {
    /// Load configuration from multiple sources with priority:
    /// 1. Base config file
    /// 2. Node-specific config file
    /// 3. `CONFIG_PATH` overlay
    /// 4. Local overrides
    /// 5. Environment variables
    ///
    /// # Arguments
    /// * `config_path` - Optional path to a node-specific configuration file
    ///
    /// # Returns
    /// Merged and validated configuration with proper priority ordering
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        // 1. Base config
        config = config.add_source(File::with_name("config/metasync").required(false));

        // 2. Node-specific overrides
        if let Some(custom) = config_path {
            config = config.add_source(File::with_name(custom).required(true));
        }

        // 3. CONFIG_PATH overlay
        if let Ok(path) = env::var("CONFIG_PATH") {
            config = config.add_source(File::with_name(&path));
        }

        // 4. Local overrides
        config = config.add_source(File::with_name("config/local").required(false));

        // 5. Environment variables (highest priority)
        config = config.add_source(
            Environment::with_prefix("METASYNC")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Self = config.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates every configuration section plus cross-section rules
    /// # Errors
    /// Returns `Error::Config` if any configuration rules are violated
    pub fn validate(&self) -> Result<()> {
        self.node.validate()?;
        self.primary.validate()?;
        self.capture.validate()?;
        self.queue.validate()?;
        self.delivery.validate()?;
        self.monitoring.validate()?;

        if self.targets.is_empty() {
            return Err(ConfigError::Message(
                "targets must contain at least one replica".into(),
            )
            .into());
        }

        // Check unique target names (cursor keys and metric labels depend on them)
        let mut names = std::collections::HashSet::new();
        for target in &self.targets {
            target.validate()?;
            let name = target.effective_name()?;
            if !names.insert(name.clone()) {
                return Err(ConfigError::Message(format!(
                    "Duplicate target name {name} in targets"
                ))
                .into());
            }
        }

        Ok(())
    }
}
