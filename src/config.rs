//! Configuration Management
//!
//! Handles persistent configuration storage for the regioncloud binary.
//! Command-line flags (and their `REGIONCLOUD_*` environment variables) win
//! over the file; the file wins over built-in defaults.

use anyhow::Result;
use regioncloud::client::{RegionOptions, DEFAULT_PAGE_SIZE};
use regioncloud::waiter::{WaitOptions, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Endpoint template used when neither flag nor file sets one
pub const DEFAULT_ENDPOINT: &str = "https://{service}.{region}.cloud.example.com/v3";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Last used region
    #[serde(default)]
    pub region: Option<String>,
    /// Project the region scope acts for
    #[serde(default)]
    pub project_id: Option<String>,
    /// Endpoint template with `{service}` and `{region}` placeholders
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub wait_timeout_secs: Option<u64>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("regioncloud").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_json(&content),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                Self::default()
            },
        }
    }

    /// Parse a config document; anything malformed yields defaults
    pub fn from_json(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_default()
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective region (CLI > config)
    pub fn effective_region(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.region.clone())
    }

    /// Get effective project (CLI > config)
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.project_id.clone())
    }

    /// Get effective endpoint template (CLI > config > default)
    pub fn effective_endpoint(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    /// Wait cadence and page size for the region scope
    pub fn region_options(&self) -> RegionOptions {
        let wait = WaitOptions::new(
            self.poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            self.wait_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        );

        RegionOptions {
            wait,
            page_size: self
                .page_size
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// Set region and save
    pub fn set_region(&mut self, region: &str) -> Result<()> {
        self.region = Some(region.to_string());
        self.save()
    }
}
