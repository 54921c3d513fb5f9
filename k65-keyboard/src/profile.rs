//! Device profile and the persistence boundary

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::KeyboardError;

/// Name of the keyboard map every profile starts with
pub const DEFAULT_KEYBOARD: &str = "default";

/// Highest hardware brightness level
pub const BRIGHTNESS_LEVEL_MAX: u16 = 1000;

/// One key of a keyboard map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEntry {
    pub name: String,
    pub row: u32,
    /// Byte offsets of the key's red channel in the per-key frame; green and
    /// blue follow at +1 and +2
    pub packet_index: Vec<usize>,
    pub color: Color,
}

/// Per-key colors for the "keyboard" effect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardMap {
    pub layout: String,
    /// Single fill color, used by models without per-key addressing
    #[serde(default)]
    pub color: Color,
    pub keys: BTreeMap<u32, KeyEntry>,
}

/// Which keys a color update touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    Key(u32),
    /// Every key in the same row as the given key
    Row(u32),
    All,
}

impl KeyboardMap {
    /// Set colors for a scope, returns false when the key is unknown
    pub fn set_color(&mut self, scope: KeyScope, color: Color) -> bool {
        let color = color.with_brightness(0.0);
        match scope {
            KeyScope::Key(id) => match self.keys.get_mut(&id) {
                Some(key) => {
                    key.color = color;
                    true
                }
                None => false,
            },
            KeyScope::Row(id) => {
                let Some(row) = self.keys.get(&id).map(|k| k.row) else {
                    return false;
                };
                self.keys
                    .values_mut()
                    .filter(|k| k.row == row)
                    .for_each(|k| k.color = color);
                true
            }
            KeyScope::All => {
                self.keys.values_mut().for_each(|k| k.color = color);
                self.color = color;
                true
            }
        }
    }
}

/// How the profile brightness mode scales effect colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum BrightnessMode {
    /// Use the effect's own brightness
    #[default]
    Effect,
    Low,
    Medium,
    High,
}

impl BrightnessMode {
    /// Fractional override, `None` when the effect decides
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Effect => None,
            Self::Low => Some(0.33),
            Self::Medium => Some(0.66),
            Self::High => Some(1.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Effect => "RGB Profile",
            Self::Low => "33 %",
            Self::Medium => "66 %",
            Self::High => "100 %",
        }
    }
}

impl From<BrightnessMode> for u8 {
    fn from(mode: BrightnessMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for BrightnessMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Effect),
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            _ => Err(format!("invalid brightness mode: {}", value)),
        }
    }
}

/// What the control dial does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DialBinding {
    #[default]
    Volume,
    Brightness,
}

impl DialBinding {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Volume => "Volume Control",
            Self::Brightness => "Brightness",
        }
    }
}

impl From<DialBinding> for u8 {
    fn from(binding: DialBinding) -> u8 {
        match binding {
            DialBinding::Volume => 1,
            DialBinding::Brightness => 2,
        }
    }
}

impl TryFrom<u8> for DialBinding {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Volume),
            2 => Ok(Self::Brightness),
            _ => Err(format!("invalid dial binding: {}", value)),
        }
    }
}

/// Persistent per-device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub active: bool,
    pub product: String,
    pub serial: String,
    pub label: String,
    pub brightness: BrightnessMode,
    pub rgb_profile: String,
    pub layout: String,
    pub keyboards: BTreeMap<String, KeyboardMap>,
    /// Active keyboard map
    pub profile: String,
    pub profiles: Vec<String>,
    pub control_dial: DialBinding,
    pub brightness_level: u16,
    /// Minutes of inactivity before the keyboard sleeps
    pub sleep_mode: u32,
}

impl DeviceProfile {
    /// First-run profile for a device
    pub fn new(product: &str, serial: &str, layout: &str, keyboard: KeyboardMap) -> Self {
        let mut keyboards = BTreeMap::new();
        keyboards.insert(DEFAULT_KEYBOARD.to_string(), keyboard);
        Self {
            active: true,
            product: product.to_string(),
            serial: serial.to_string(),
            label: "Keyboard".to_string(),
            brightness: BrightnessMode::Effect,
            rgb_profile: "keyboard".to_string(),
            layout: layout.to_string(),
            keyboards,
            profile: DEFAULT_KEYBOARD.to_string(),
            profiles: vec![DEFAULT_KEYBOARD.to_string()],
            control_dial: DialBinding::Volume,
            brightness_level: BRIGHTNESS_LEVEL_MAX,
            sleep_mode: 15,
        }
    }

    /// The keyboard map currently in use
    pub fn current_keyboard(&self) -> Option<&KeyboardMap> {
        self.keyboards.get(&self.profile)
    }

    pub fn current_keyboard_mut(&mut self) -> Option<&mut KeyboardMap> {
        self.keyboards.get_mut(&self.profile)
    }
}

/// Shared current profile
///
/// Readers take an immutable snapshot; writers replace the whole value, so a
/// reader never observes a half-applied update.
#[derive(Debug, Clone)]
pub struct ProfileCell(Arc<RwLock<Arc<DeviceProfile>>>);

impl ProfileCell {
    pub fn new(profile: DeviceProfile) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(profile))))
    }

    pub fn snapshot(&self) -> Arc<DeviceProfile> {
        Arc::clone(&self.0.read())
    }

    /// Apply a mutation to a copy and publish it
    pub fn update<R>(&self, f: impl FnOnce(&mut DeviceProfile) -> R) -> (R, Arc<DeviceProfile>) {
        let mut guard = self.0.write();
        let mut next = DeviceProfile::clone(&guard);
        let result = f(&mut next);
        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        (result, next)
    }

    pub fn replace(&self, profile: DeviceProfile) {
        *self.0.write() = Arc::new(profile);
    }
}

/// Profile persistence
pub trait ProfileStore: Send + Sync {
    /// Load the profile saved for a serial, `Ok(None)` on first run
    fn load(&self, serial: &str) -> Result<Option<DeviceProfile>, KeyboardError>;

    fn save(&self, profile: &DeviceProfile) -> Result<(), KeyboardError>;
}
