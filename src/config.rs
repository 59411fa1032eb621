//! Tool configuration file
//!
//! Settings for the serial link and the dump drain loop, loaded from TOML.
//! Every key is optional; missing keys take the defaults the monitor
//! expects (9600 baud, one second settle delay).
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//!
//! [dump]
//! settle_delay_ms = 1000
//! capture_file = "dump.txt"
//! ```

use crate::monitor::DumpSettings;
use crate::serial::port::{DEFAULT_BAUD, DEFAULT_DEVICE_PATTERN};
use crate::serial::PortConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete tool configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub serial: SerialSection,
    pub dump: DumpSection,
}

/// `[serial]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSection {
    /// Serial device; auto-detected from `device_pattern` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Read/write timeout in seconds
    pub timeout_secs: u64,
    /// Regex matched against port names during auto-detection
    pub device_pattern: String,
    /// Show the startup banner as a hex dump instead of text
    pub show_raw: bool,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD,
            timeout_secs: 5,
            device_pattern: DEFAULT_DEVICE_PATTERN.to_string(),
            show_raw: false,
        }
    }
}

/// `[dump]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpSection {
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub chunk_size: usize,
    /// Where the raw monitor reply is captured
    pub capture_file: PathBuf,
    /// Binary image written after a successful dump, if set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

impl Default for DumpSection {
    fn default() -> Self {
        let settings = DumpSettings::default();
        Self {
            settle_delay_ms: settings.settle_delay.as_millis() as u64,
            poll_interval_ms: settings.poll_interval.as_millis() as u64,
            chunk_size: settings.chunk_size,
            capture_file: PathBuf::from("dump.txt"),
            output_file: None,
        }
    }
}

impl ToolConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::parse_content(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Parse configuration from TOML content
    pub fn parse_content(content: &str) -> Result<Self> {
        let config: ToolConfig = toml::from_str(content)?;
        log::debug!("Loaded config: {:?}", config);
        Ok(config)
    }

    /// Render as TOML, suitable for `load`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.serial.timeout_secs)
    }

    /// Port settings for `port_path` using the configured baud and timeout
    pub fn port_config(&self, port_path: &str) -> PortConfig {
        PortConfig::new(port_path)
            .with_baud_rate(self.serial.baud_rate)
            .with_timeout(self.timeout())
    }

    pub fn dump_settings(&self) -> DumpSettings {
        DumpSettings {
            settle_delay: Duration::from_millis(self.dump.settle_delay_ms),
            poll_interval: Duration::from_millis(self.dump.poll_interval_ms),
            chunk_size: self.dump.chunk_size,
        }
    }
}
