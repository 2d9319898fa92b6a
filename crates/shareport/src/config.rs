use std::path::Path;

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Name reported in directory-listing payloads
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Maximum file size for uploads (in bytes)
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,

    /// Require per-client approval before serving any request.
    /// Fixed for the server's lifetime; changing it requires a restart.
    #[serde(default)]
    pub require_approval: bool,
}

fn default_server_name() -> String {
    "Shareport".to_string()
}

fn default_max_upload_size() -> u64 {
    1024 * 1024 * 1024 // 1 GiB
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            max_upload_size: default_max_upload_size(),
            require_approval: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.server_name, "Shareport");
        assert!(!config.require_approval);
        assert!(config.max_upload_size > 0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("require_approval = true").unwrap();
        assert!(config.require_approval);
        assert_eq!(config.server_name, "Shareport");
        assert_eq!(config.max_upload_size, default_max_upload_size());
    }
}
