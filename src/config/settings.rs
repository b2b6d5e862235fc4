//! Application settings and paths.
//!
//! Settings live in an XDG-compliant config directory as JSON. Any field
//! missing from the file falls back to its default.

use crate::cli::OutputFormat;
use crate::error::{ConfigError, ConfigResult};
use crate::scanner::ScannerConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portprobe)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the platform directories. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "portprobe", "portprobe")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Per-probe timeout in milliseconds.
    pub default_timeout_ms: u64,
    /// Maximum probes in flight, 0 for unbounded.
    pub default_concurrency: usize,
    /// Default output format.
    pub default_output_format: OutputFormat,
    /// Include closed ports in plain output.
    pub show_closed: bool,
    /// Report timed-out probes as unknown instead of closed.
    pub report_unknown: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 3000,
            default_concurrency: 500,
            default_output_format: OutputFormat::Plain,
            show_closed: false,
            report_unknown: false,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, or defaults if absent.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::discover()?.settings_file();

        if !file.exists() {
            debug!(path = %file.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    /// Build the scanner configuration these settings describe.
    pub fn scanner_config(&self) -> ScannerConfig {
        let config = ScannerConfig::new(Duration::from_millis(self.default_timeout_ms));
        let config = match self.default_concurrency {
            0 => config,
            limit => config.with_concurrency(limit),
        };

        if self.report_unknown {
            config.with_unknown()
        } else {
            config
        }
    }
}
