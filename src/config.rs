//! Daemon configuration
//!
//! Loaded from TOML; a missing file means all defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use k65_keyboard::{EffectCatalog, EffectSettings, KeyboardModel};
use k65_transport::protocol::{interface, timing};
use k65_transport::VENDOR_ID;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub daemon: DaemonConfig,
    /// Per-effect overrides of the built-in catalog
    pub effects: BTreeMap<String, EffectSettings>,
}

/// Which keyboard to drive and how to reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: Option<u16>,
    pub serial: Option<String>,
    /// `k65-plus` or `k65-plus-wireless`, detected from the product id when unset
    pub model: Option<String>,
    pub command_interface: i32,
    pub dial_interface: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: None,
            serial: None,
            model: None,
            command_interface: interface::COMMAND,
            dial_interface: interface::DIAL,
        }
    }
}

impl DeviceConfig {
    pub fn model(&self) -> anyhow::Result<Option<KeyboardModel>> {
        self.model
            .as_deref()
            .map(|m| m.parse::<KeyboardModel>().map_err(anyhow::Error::msg))
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub keep_alive_ms: u64,
    pub telemetry_ms: u64,
    pub volume_step: u8,
    pub profiles_dir: Option<PathBuf>,
    pub layouts_dir: Option<PathBuf>,
    /// Sensor label searched for the CPU temperature
    pub cpu_sensor: String,
    pub gpu_sensor: String,
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            keep_alive_ms: timing::KEEP_ALIVE_MS,
            telemetry_ms: timing::TELEMETRY_MS,
            volume_step: k65_keyboard::dial::VOLUME_STEP,
            profiles_dir: None,
            layouts_dir: None,
            cpu_sensor: "Tctl".to_string(),
            gpu_sensor: "amdgpu".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl DaemonConfig {
    pub fn profiles_dir(&self) -> PathBuf {
        self.profiles_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("profiles"))
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.layouts_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("layouts"))
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("k65d")
}

impl Config {
    /// Get default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("k65d")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config.device.model()?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Built-in effects with the `[effects.*]` overrides applied
    pub fn catalog(&self) -> EffectCatalog {
        let mut catalog = EffectCatalog::builtin();
        catalog.merge(&self.effects);
        catalog
    }
}
