//! Effect names, settings and resolved descriptors

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Speed bounds
pub const SPEED_MIN: f64 = 0.1;
pub const SPEED_MAX: f64 = 10.0;

/// Smoothness bounds, in interpolation steps
pub const SMOOTHNESS_MIN: u32 = 1;
pub const SMOOTHNESS_MAX: u32 = 100;

/// Every lighting effect either model knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectKind {
    Off,
    Static,
    Keyboard,
    Rainbow,
    Watercolor,
    ColorPulse,
    ColorShift,
    ColorWarp,
    Wave,
    Storm,
    Flickering,
    Circle,
    CircleShift,
    Spinner,
    Rotator,
    CpuTemperature,
    GpuTemperature,
    // Firmware-animated
    Rain,
    Tlk,
    Tlr,
    SpiralRainbow,
    RainbowWave,
    ColorWave,
}

impl EffectKind {
    pub const ALL: [EffectKind; 23] = [
        Self::Off,
        Self::Static,
        Self::Keyboard,
        Self::Rainbow,
        Self::Watercolor,
        Self::ColorPulse,
        Self::ColorShift,
        Self::ColorWarp,
        Self::Wave,
        Self::Storm,
        Self::Flickering,
        Self::Circle,
        Self::CircleShift,
        Self::Spinner,
        Self::Rotator,
        Self::CpuTemperature,
        Self::GpuTemperature,
        Self::Rain,
        Self::Tlk,
        Self::Tlr,
        Self::SpiralRainbow,
        Self::RainbowWave,
        Self::ColorWave,
    ];

    /// Profile name of the effect
    pub fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Static => "static",
            Self::Keyboard => "keyboard",
            Self::Rainbow => "rainbow",
            Self::Watercolor => "watercolor",
            Self::ColorPulse => "colorpulse",
            Self::ColorShift => "colorshift",
            Self::ColorWarp => "colorwarp",
            Self::Wave => "wave",
            Self::Storm => "storm",
            Self::Flickering => "flickering",
            Self::Circle => "circle",
            Self::CircleShift => "circleshift",
            Self::Spinner => "spinner",
            Self::Rotator => "rotator",
            Self::CpuTemperature => "cpu-temperature",
            Self::GpuTemperature => "gpu-temperature",
            Self::Rain => "rain",
            Self::Tlk => "tlk",
            Self::Tlr => "tlr",
            Self::SpiralRainbow => "spiralrainbow",
            Self::RainbowWave => "rainbowwave",
            Self::ColorWave => "colorwave",
        }
    }

    /// Display name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Static => "Static",
            Self::Keyboard => "Keyboard",
            Self::Rainbow => "Rainbow",
            Self::Watercolor => "Watercolor",
            Self::ColorPulse => "Color Pulse",
            Self::ColorShift => "Color Shift",
            Self::ColorWarp => "Color Warp",
            Self::Wave => "Wave",
            Self::Storm => "Storm",
            Self::Flickering => "Flickering",
            Self::Circle => "Circle",
            Self::CircleShift => "Circle Shift",
            Self::Spinner => "Spinner",
            Self::Rotator => "Rotator",
            Self::CpuTemperature => "CPU Temperature",
            Self::GpuTemperature => "GPU Temperature",
            Self::Rain => "Rain",
            Self::Tlk => "Type Lighting - Key",
            Self::Tlr => "Type Lighting - Ripple",
            Self::SpiralRainbow => "Spiral Rainbow",
            Self::RainbowWave => "Rainbow Wave",
            Self::ColorWave => "Color Wave",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    pub fn is_temperature(&self) -> bool {
        matches!(self, Self::CpuTemperature | Self::GpuTemperature)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown effect: {}", s))
    }
}

/// User-tunable parameters of one effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    pub speed: f64,
    pub smoothness: u32,
    /// Both colors must be set and non-black to be used, otherwise the
    /// engine draws random ones
    pub start_color: Option<Color>,
    pub end_color: Option<Color>,
    pub brightness: f64,
    pub min_temp: f64,
    pub max_temp: f64,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            speed: 4.0,
            smoothness: 40,
            start_color: None,
            end_color: None,
            brightness: 1.0,
            min_temp: 30.0,
            max_temp: 80.0,
        }
    }
}

/// Named effect settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectCatalog {
    effects: BTreeMap<String, EffectSettings>,
}

impl Default for EffectCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EffectCatalog {
    /// Built-in settings for every effect
    pub fn builtin() -> Self {
        let effects = EffectKind::ALL
            .iter()
            .map(|kind| (kind.name().to_string(), builtin_settings(*kind)))
            .collect();
        Self { effects }
    }

    /// Catalog with no entries
    pub fn empty() -> Self {
        Self {
            effects: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EffectSettings> {
        self.effects.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, settings: EffectSettings) {
        self.effects.insert(name.into(), settings);
    }

    pub fn remove(&mut self, name: &str) -> Option<EffectSettings> {
        self.effects.remove(name)
    }

    /// Replace built-in entries with user overrides
    pub fn merge(&mut self, overrides: &BTreeMap<String, EffectSettings>) {
        for (name, settings) in overrides {
            self.effects.insert(name.clone(), settings.clone());
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.effects.keys().map(String::as_str)
    }
}

fn builtin_settings(kind: EffectKind) -> EffectSettings {
    let mut s = EffectSettings::default();
    match kind {
        EffectKind::Static => {
            s.start_color = Some(Color::rgb(255, 255, 255));
            s.end_color = Some(Color::rgb(255, 255, 255));
        }
        EffectKind::CpuTemperature | EffectKind::GpuTemperature => {
            s.start_color = Some(Color::rgb(0, 255, 0));
            s.end_color = Some(Color::rgb(255, 0, 0));
            s.smoothness = 20;
        }
        EffectKind::ColorPulse | EffectKind::Flickering => s.smoothness = 20,
        EffectKind::Rainbow | EffectKind::Watercolor => s.speed = 1.0,
        _ => {}
    }
    s
}

/// Effect resolved against its settings with all bounds applied
#[derive(Debug, Clone, PartialEq)]
pub struct EffectDescriptor {
    pub kind: EffectKind,
    pub speed: f64,
    pub smoothness: u32,
    /// Explicit start/end pair, `None` means draw random colors
    pub colors: Option<(Color, Color)>,
    pub brightness: f64,
    pub min_temp: f64,
    pub max_temp: f64,
}

impl EffectDescriptor {
    pub fn new(kind: EffectKind, settings: &EffectSettings) -> Self {
        let colors = match (settings.start_color, settings.end_color) {
            (Some(start), Some(end)) if !start.is_unset() && !end.is_unset() => {
                Some((start, end))
            }
            _ => None,
        };
        Self {
            kind,
            speed: clamp_speed(settings.speed),
            smoothness: settings.smoothness.clamp(SMOOTHNESS_MIN, SMOOTHNESS_MAX),
            colors,
            brightness: settings.brightness.clamp(0.0, 1.0),
            min_temp: settings.min_temp,
            max_temp: settings.max_temp,
        }
    }

    /// Resolve a profile effect name, `None` if the name or its settings are unknown
    pub fn resolve(name: &str, catalog: &EffectCatalog) -> Option<Self> {
        let kind = EffectKind::from_name(name)?;
        catalog.get(name).map(|s| Self::new(kind, s))
    }

    /// Override the brightness of the descriptor and its colors
    pub fn with_brightness(mut self, brightness: f64) -> Self {
        let b = brightness.clamp(0.0, 1.0);
        self.brightness = b;
        self.colors = self
            .colors
            .map(|(s, e)| (s.with_brightness(b), e.with_brightness(b)));
        self
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return SPEED_MIN;
    }
    speed.clamp(SPEED_MIN, SPEED_MAX)
}
