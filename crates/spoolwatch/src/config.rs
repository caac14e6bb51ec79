//! Application configuration.
//!
//! Loaded once at startup from `~/.spoolwatch/config.json` (the group
//! timeout can additionally be changed live through
//! `PrintJobMonitor::update_group_timeout`). Loading is fail-open: a
//! missing or malformed file yields defaults so the monitor can always
//! come up.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spoolwatch_protocol::defaults;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitoring: MonitoringSettings,
    pub printers: PrinterSettings,
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub enabled: bool,
    pub polling_interval_secs: u64,
    pub group_timeout_minutes: u64,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            polling_interval_secs: defaults::DEFAULT_POLL_INTERVAL_SECS,
            group_timeout_minutes: defaults::DEFAULT_GROUP_TIMEOUT_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterSettings {
    pub enabled_printers: Vec<String>,
    pub excluded_printers: Vec<String>,
}

impl PrinterSettings {
    /// The printers the monitor actually polls: enabled minus excluded.
    pub fn monitored(&self) -> Vec<String> {
        self.enabled_printers
            .iter()
            .filter(|name| !self.excluded_printers.contains(name))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub max_file_size_mb: u64,
    pub supported_extensions: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_file_size_mb: defaults::DEFAULT_MAX_ANALYZED_FILE_SIZE_MB,
            supported_extensions: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Default on-disk location: `<spoolwatch home>/config.json`.
    pub fn config_path() -> PathBuf {
        spoolwatch_logging::spoolwatch_home().join("config.json")
    }

    /// Load from the default location.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path. Missing file -> defaults; malformed
    /// file -> defaults with an error log. Never fails.
    pub fn load_from(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                info!("Configuration file not found, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => {
                info!("Configuration loaded from {}", path.display());
                config
            }
            Err(e) => {
                error!(
                    "Malformed configuration at {}, using defaults: {e}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Write pretty JSON to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring.polling_interval_secs)
    }

    pub fn group_timeout(&self) -> Duration {
        Duration::from_secs(self.monitoring.group_timeout_minutes * 60)
    }
}
