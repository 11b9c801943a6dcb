//! Configuration file loading and saving
//!
//! Loads user configuration from `~/.config/hudcap/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::types::Resolution;

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Device selection
    #[serde(default)]
    pub device: DeviceSettings,

    /// Frame geometry
    #[serde(default)]
    pub video: VideoSettings,

    /// Hot-plug discovery
    #[serde(default)]
    pub discovery: DiscoverySettings,

    /// Capture task tuning
    #[serde(default)]
    pub capture: CaptureSettings,
}

/// Which device and backend to open
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Device index (absent = no device)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// Backend name (empty = default backend)
    #[serde(default)]
    pub backend: String,
}

/// Required frame geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSettings {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,
}

/// Discovery polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Seconds between discovery passes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Device slots probed per pass
    #[serde(default = "default_max_sources")]
    pub max_sources: u32,
}

/// Capture task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Milliseconds close waits for the capture task
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// Microseconds slept between frame reads
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,
}

fn default_width() -> u32 {
    Resolution::FULL_HD.width
}

fn default_height() -> u32 {
    Resolution::FULL_HD.height
}

fn default_interval_secs() -> u64 {
    super::DEFAULT_DISCOVERY_INTERVAL.as_secs()
}

fn default_max_sources() -> u32 {
    super::DEFAULT_MAX_SOURCES
}

fn default_stop_timeout_ms() -> u64 {
    super::DEFAULT_STOP_TIMEOUT.as_millis() as u64
}

fn default_poll_interval_us() -> u64 {
    super::DEFAULT_POLL_INTERVAL.as_micros() as u64
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_sources: default_max_sources(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            stop_timeout_ms: default_stop_timeout_ms(),
            poll_interval_us: default_poll_interval_us(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("hudcap").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("hudcap")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/hudcap/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;

        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| CaptureError::Config(format!("Failed to parse config file: {}", e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path())
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CaptureError::Config(format!("Failed to serialize config: {}", e)))?;
        write_file(&path, &content)?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Write the commented sample config to the default path
    ///
    /// Returns false without touching an existing file unless `force` is set.
    pub fn init(force: bool) -> Result<bool> {
        Self::init_at(Self::default_path(), force)
    }

    /// Write the commented sample config to `path`
    pub fn init_at(path: PathBuf, force: bool) -> Result<bool> {
        if path.exists() && !force {
            return Ok(false);
        }

        write_file(&path, &sample_config())?;
        info!("Created configuration file {:?}", path);
        Ok(true)
    }

    /// Build the runtime configuration, validating it
    pub fn to_capture_config(&self) -> Result<CaptureConfig> {
        let config = CaptureConfig {
            device: self.device.index,
            backend: self.device.backend.clone(),
            main_resolution: Resolution::new(self.video.width, self.video.height),
            discovery_interval: Duration::from_secs(self.discovery.interval_secs),
            max_sources: self.discovery.max_sources,
            stop_timeout: Duration::from_millis(self.capture.stop_timeout_ms),
            poll_interval: Duration::from_micros(self.capture.poll_interval_us),
            ..CaptureConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Record the device selection from a runtime configuration
    pub fn update_from(&mut self, config: &CaptureConfig) {
        self.device.index = config.device;
        self.device.backend = config.backend.clone();
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# hudcap Configuration

[device]
# Capture device index as listed by `hudcap list-sources` (omit for no device)
# index = 0

# Capture backend as listed by `hudcap list-backends` (empty = default)
backend = ""

[video]
# Every device must negotiate exactly this resolution
width = 1920
height = 1080

[discovery]
# Seconds between hot-plug discovery passes
interval_secs = 5

# Device slots probed per pass (probing stops at the first empty slot)
max_sources = 10

[capture]
# Milliseconds `close` waits for the capture task before giving up
stop_timeout_ms = 5000

# Microseconds slept between frame reads
poll_interval_us = 1000
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.device.index, None);
        assert_eq!(config.video.width, 1920);
        assert_eq!(config.discovery.max_sources, 10);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: ConfigFile = toml::from_str(&sample_config()).unwrap();
        assert_eq!(config.video.height, 1080);
        assert_eq!(config.capture.stop_timeout_ms, 5000);
        let runtime = config.to_capture_config().unwrap();
        assert_eq!(runtime, CaptureConfig::default());
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        let mut config = ConfigFile::default();
        config.video.width = 0;
        assert!(config.to_capture_config().is_err());
    }
}
