//! Color model
//!
//! Colors carry float channels so interpolation stays precise between ticks;
//! they are rounded and clamped to bytes only when a frame is emitted.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// RGB color with a brightness scale factor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    /// 0.0 - 1.0
    pub brightness: f64,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f64,
            green: green as f64,
            blue: blue as f64,
            brightness: 1.0,
        }
    }

    pub fn with_brightness(self, brightness: f64) -> Self {
        Self { brightness, ..self }
    }

    /// True when all channels are zero, the profile encoding for "no color"
    pub fn is_unset(&self) -> bool {
        self.red == 0.0 && self.green == 0.0 && self.blue == 0.0
    }

    /// Channels rounded and clamped to bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            clamp_channel(self.red),
            clamp_channel(self.green),
            clamp_channel(self.blue),
        ]
    }
}

fn clamp_channel(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// Scale channels by the color's own brightness
pub fn modify_brightness(color: Color) -> Color {
    let b = color.brightness.clamp(0.0, 1.0);
    let scale = |v: f64| f64::from(clamp_channel(v * b));
    Color {
        red: scale(color.red),
        green: scale(color.green),
        blue: scale(color.blue),
        brightness: b,
    }
}

/// `a + (b - a) * t`
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Interpolate every channel of two colors, brightness is taken from `a`
pub fn lerp_color(a: &Color, b: &Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    Color {
        red: lerp(a.red, b.red, t).clamp(0.0, 255.0),
        green: lerp(a.green, b.green, t).clamp(0.0, 255.0),
        blue: lerp(a.blue, b.blue, t).clamp(0.0, 255.0),
        brightness: a.brightness,
    }
}

/// HSB/HSV to RGB (h: 0-360, s: 0-1, v: 0-1)
pub fn hsb_to_rgb(h: f64, s: f64, v: f64) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h / 60.0) as i32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (
        clamp_channel((r + m) * 255.0),
        clamp_channel((g + m) * 255.0),
        clamp_channel((b + m) * 255.0),
    )
}

/// Uniformly random channels with the given brightness
pub fn random_color(brightness: f64) -> Color {
    let mut rng = rand::rng();
    Color {
        red: f64::from(rng.random::<u8>()),
        green: f64::from(rng.random::<u8>()),
        blue: f64::from(rng.random::<u8>()),
        brightness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modify_brightness_bounds() {
        let c = Color::rgb(200, 17, 255);
        assert_eq!(modify_brightness(c.with_brightness(0.0)).to_bytes(), [0, 0, 0]);
        assert_eq!(modify_brightness(c.with_brightness(1.0)).to_bytes(), [200, 17, 255]);
    }

    #[test]
    fn test_modify_brightness_rounds() {
        let c = modify_brightness(Color::rgb(255, 0, 0).with_brightness(0.5));
        assert_eq!(c.to_bytes(), [128, 0, 0]);
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Color::rgb(10, 200, 30);
        let b = Color::rgb(250, 0, 99);
        assert_eq!(lerp_color(&a, &b, 0.0).to_bytes(), a.to_bytes());
        assert_eq!(lerp_color(&a, &b, 1.0).to_bytes(), b.to_bytes());
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    }

    #[test]
    fn test_hsb_to_rgb() {
        assert_eq!(hsb_to_rgb(0.0, 1.0, 1.0), (255, 0, 0));
        assert_eq!(hsb_to_rgb(120.0, 1.0, 1.0), (0, 255, 0));
        assert_eq!(hsb_to_rgb(240.0, 1.0, 1.0), (0, 0, 255));
        assert_eq!(hsb_to_rgb(360.0, 1.0, 1.0), (255, 0, 0));
        assert_eq!(hsb_to_rgb(0.0, 0.0, 1.0), (255, 255, 255));
    }

    #[test]
    fn test_random_color_keeps_brightness() {
        let c = random_color(0.25);
        assert_eq!(c.brightness, 0.25);
        for v in [c.red, c.green, c.blue] {
            assert!((0.0..=255.0).contains(&v));
        }
    }

    #[test]
    fn test_to_bytes_clamps() {
        let c = Color {
            red: 300.0,
            green: -5.0,
            blue: f64::NAN,
            brightness: 1.0,
        };
        assert_eq!(c.to_bytes(), [255, 0, 0]);
    }
}
