use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvConfig {
    /// Directory where converted files are written
    pub output_dir: PathBuf,
    /// Owner cache file (id -> name JSON map)
    pub cache_path: PathBuf,
    /// Remote video info endpoint, queried with `aid=<asset id>`
    pub api_endpoint: String,
    /// Transcoder executable used in generated commands
    pub transcoder: String,
    /// Per-request timeout in seconds; `None` waits indefinitely
    pub request_timeout_secs: Option<u64>,
    /// Print commands instead of executing them
    pub debug_mode: bool,
}

impl Default for ConvConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ConvConfig {
    /// Create a default configuration with sensible values
    pub fn default_config() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            cache_path: PathBuf::from("cache/uid.json"),
            api_endpoint: "https://uapis.cn/api/v1/social/bilibili/videoinfo".to_string(),
            transcoder: "ffmpeg".to_string(),
            request_timeout_secs: None,
            debug_mode: false,
        }
    }

    /// Directory holding the owner cache file
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

                // TOML by extension, JSON otherwise
                if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    config = toml::from_str(&content)
                        .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
                } else {
                    config = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
                }
            }
        }

        Ok(config)
    }
}
