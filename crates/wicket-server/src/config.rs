//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Paths the daemon reads and writes.
///
/// The bind address and port come from the command line instead; these
/// are the fixed file locations of the deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the credential file
    pub passwd_file: PathBuf,

    /// Path to the IP allow-list (one address literal per line)
    pub allowlist_file: PathBuf,

    /// Path to the append-only audit log
    pub audit_log_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            passwd_file: PathBuf::from("passwd"),
            allowlist_file: PathBuf::from("whitelist"),
            audit_log_file: PathBuf::from("server.log"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
