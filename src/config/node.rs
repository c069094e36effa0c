use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NodeConfig {
    #[serde(default = "default_node_id")]
    pub node_id: u32,

    #[serde(default = "default_db_dir")]
    pub db_root_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}
impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            db_root_dir: default_db_dir(),
            log_dir: default_log_dir(),
        }
    }
}

impl NodeConfig {
    /// Validates node identity and storage paths
    /// # Errors
    /// Returns `Error::Config` if any configuration rules are violated
    pub fn validate(&self) -> Result<()> {
        if self.node_id == 0 {
            return Err(ConfigError::Message(
                "node_id cannot be 0 (reserved for invalid nodes)".into(),
            )
            .into());
        }

        self.validate_directory(&self.db_root_dir, "db_root_dir")?;
        self.validate_directory(&self.log_dir, "log_dir")?;

        Ok(())
    }

    /// Ensures directory path is valid and writable
    fn validate_directory(
        &self,
        path: &PathBuf,
        name: &str,
    ) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Message(format!("{name} path cannot be empty")).into());
        }

        #[cfg(not(test))]
        {
            use std::fs;
            // Check directory existence or create ability
            if !path.exists() {
                fs::create_dir_all(path).map_err(|e| {
                    ConfigError::Message(format!(
                        "Failed to create {} directory at {}: {}",
                        name,
                        path.display(),
                        e
                    ))
                })?;
            }

            // Check write permissions
            let test_file = path.join(".permission_test");
            fs::write(&test_file, b"test").map_err(|e| {
                ConfigError::Message(format!(
                    "No write permission in {} directory {}: {}",
                    name,
                    path.display(),
                    e
                ))
            })?;
            fs::remove_file(&test_file).ok();
        }

        Ok(())
    }
}

fn default_node_id() -> u32 {
    1
}
fn default_db_dir() -> PathBuf {
    PathBuf::from("/tmp/metasync/db")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/metasync/logs")
}
