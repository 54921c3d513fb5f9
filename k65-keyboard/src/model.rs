//! Per-model protocol parameters

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use k65_transport::protocol::{cmd, data_type, product};
use k65_transport::{ColorFraming, Target, TransportType};

use crate::color::Color;
use crate::effect::EffectKind;

/// Supported keyboard models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardModel {
    K65Plus,
    K65PlusWireless,
}

/// How an effect reaches the LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Rendered on the host every tick
    Animated,
    /// Rendered once, no loop
    Once,
    /// Firmware animates after a single trigger write
    Offloaded(OffloadTrigger),
}

/// Trigger write for a firmware-animated effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffloadTrigger {
    /// Data type tag that selects the firmware effect
    pub tag: &'static [u8],
    /// Payload length
    pub len: usize,
    /// Fixed payload bytes
    pub preset: &'static [(usize, u8)],
    /// Offset of a blue/green/red triple taken from the keyboard fill color
    pub color_at: Option<usize>,
}

impl OffloadTrigger {
    pub fn payload(&self, color: Option<&Color>) -> Vec<u8> {
        let mut buf = vec![0u8; self.len];
        for &(i, v) in self.preset {
            if let Some(slot) = buf.get_mut(i) {
                *slot = v;
            }
        }
        if let (Some(at), Some(color)) = (self.color_at, color) {
            let [r, g, b] = color.to_bytes();
            for (i, v) in [b, g, r].into_iter().enumerate() {
                if let Some(slot) = buf.get_mut(at + i) {
                    *slot = v;
                }
            }
        }
        buf
    }
}

const FILL_PRESET: &[(usize, u8)] = &[(3, 0x01), (4, 0xFF)];

mod trigger {
    use super::{OffloadTrigger, FILL_PRESET};

    const fn plain(tag: &'static [u8]) -> OffloadTrigger {
        OffloadTrigger {
            tag,
            len: 89,
            preset: &[],
            color_at: None,
        }
    }

    pub const RAIN: OffloadTrigger = plain(&[0x7E, 0xA0, 0x02, 0x04, 0x01]);
    pub const TLK: OffloadTrigger = plain(&[0xF9, 0xB1, 0x02, 0x04]);
    pub const TLR: OffloadTrigger = plain(&[0xA2, 0x09, 0x02, 0x04]);
    pub const SPIRAL_RAINBOW: OffloadTrigger = plain(&[0x87, 0xAB, 0x00, 0x04, 0x06]);
    pub const COLOR_PULSE: OffloadTrigger = plain(&[0x4F, 0xAD, 0x02, 0x04]);
    pub const COLOR_SHIFT: OffloadTrigger = plain(&[0xFA, 0xA5, 0x02, 0x04]);
    pub const COLOR_WAVE: OffloadTrigger = plain(&[0xFF, 0x7B, 0x02, 0x04, 0x04]);
    pub const RAINBOW_WAVE: OffloadTrigger = plain(&[0x4C, 0xB9, 0x00, 0x04, 0x04]);

    pub const WATERCOLOR: OffloadTrigger = OffloadTrigger {
        tag: &[0x22, 0x00, 0x03, 0x04],
        len: 93,
        preset: &[(2, 0x01), (3, 0xFF), (4, 0xFF), (5, 0xFF), (6, 0xFF)],
        color_at: None,
    };

    pub const FILL: OffloadTrigger = OffloadTrigger {
        tag: &[0x7E, 0x20, 0x01],
        len: 93,
        preset: FILL_PRESET,
        color_at: Some(5),
    };

    pub const OFF: OffloadTrigger = OffloadTrigger {
        tag: &[0x7E, 0x20, 0x01],
        len: 93,
        preset: FILL_PRESET,
        color_at: None,
    };
}

const WIRED_EFFECTS: &[EffectKind] = &[
    EffectKind::Off,
    EffectKind::Static,
    EffectKind::Keyboard,
    EffectKind::Rainbow,
    EffectKind::Watercolor,
    EffectKind::ColorPulse,
    EffectKind::ColorShift,
    EffectKind::ColorWarp,
    EffectKind::Wave,
    EffectKind::Storm,
    EffectKind::Flickering,
    EffectKind::Circle,
    EffectKind::CircleShift,
    EffectKind::Spinner,
    EffectKind::Rotator,
    EffectKind::CpuTemperature,
    EffectKind::GpuTemperature,
];

const WIRELESS_EFFECTS: &[EffectKind] = &[
    EffectKind::Watercolor,
    EffectKind::ColorPulse,
    EffectKind::ColorShift,
    EffectKind::ColorWave,
    EffectKind::Rain,
    EffectKind::RainbowWave,
    EffectKind::SpiralRainbow,
    EffectKind::Tlk,
    EffectKind::Tlr,
    EffectKind::Keyboard,
    EffectKind::Off,
];

impl KeyboardModel {
    pub fn from_product_id(pid: u16) -> Option<Self> {
        match pid {
            product::K65_PLUS => Some(Self::K65Plus),
            product::K65_PLUS_WIRELESS => Some(Self::K65PlusWireless),
            _ => None,
        }
    }

    pub fn product_id(&self) -> u16 {
        match self {
            Self::K65Plus => product::K65_PLUS,
            Self::K65PlusWireless => product::K65_PLUS_WIRELESS,
        }
    }

    /// Config name
    pub fn id(&self) -> &'static str {
        match self {
            Self::K65Plus => "k65-plus",
            Self::K65PlusWireless => "k65-plus-wireless",
        }
    }

    pub fn product_name(&self) -> &'static str {
        match self {
            Self::K65Plus => "K65 Plus",
            Self::K65PlusWireless => "K65 Plus Wireless",
        }
    }

    /// Layout catalog key
    pub fn layout_key(&self) -> &'static str {
        match self {
            Self::K65Plus => "k65plus-default",
            Self::K65PlusWireless => "k65plusW-default",
        }
    }

    pub fn transport_type(&self) -> TransportType {
        match self {
            Self::K65Plus => TransportType::HidWired,
            Self::K65PlusWireless => TransportType::HidDongle,
        }
    }

    pub fn is_wireless(&self) -> bool {
        self.transport_type().is_wireless()
    }

    /// Addressable LEDs
    pub fn led_channels(&self) -> usize {
        123
    }

    /// Size of the per-key frame
    pub fn color_packet_length(&self) -> usize {
        371
    }

    pub fn framing(&self) -> ColorFraming {
        match self {
            Self::K65Plus => ColorFraming::WIRED,
            Self::K65PlusWireless => ColorFraming::WIRELESS,
        }
    }

    /// Tag for host-rendered channel frames
    pub fn color_tag(&self) -> &'static [u8] {
        match self {
            Self::K65Plus => data_type::SET_COLOR_WIRED,
            Self::K65PlusWireless => data_type::SET_COLOR_WIRELESS,
        }
    }

    /// Wired frames carry a reserved slot at payload bytes 3..6
    pub fn reserved_span(&self) -> Option<std::ops::Range<usize>> {
        match self {
            Self::K65Plus => Some(3..6),
            Self::K65PlusWireless => None,
        }
    }

    pub fn activate_led(&self) -> &'static [u8] {
        match self {
            Self::K65Plus => cmd::ACTIVATE_LED_WIRED,
            Self::K65PlusWireless => cmd::ACTIVATE_LED_WIRELESS,
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(20)
    }

    /// Targets switched into software/hardware mode, in order
    pub fn mode_targets(&self) -> &'static [Target] {
        match self {
            Self::K65Plus => &[Target::Keyboard],
            Self::K65PlusWireless => &[Target::Dongle, Target::Keyboard],
        }
    }

    pub fn keep_alive_targets(&self) -> &'static [Target] {
        self.mode_targets()
    }

    /// Frame of zeros before every apply
    pub fn resets_before_apply(&self) -> bool {
        matches!(self, Self::K65Plus)
    }

    pub fn has_sleep_timer(&self) -> bool {
        self.is_wireless()
    }

    pub fn effects(&self) -> &'static [EffectKind] {
        match self {
            Self::K65Plus => WIRED_EFFECTS,
            Self::K65PlusWireless => WIRELESS_EFFECTS,
        }
    }

    pub fn supports(&self, kind: EffectKind) -> bool {
        self.effects().contains(&kind)
    }

    /// Rendering strategy, `None` if the model cannot show the effect
    pub fn strategy(&self, kind: EffectKind) -> Option<Strategy> {
        if !self.supports(kind) {
            return None;
        }
        let strategy = match self {
            Self::K65Plus => match kind {
                EffectKind::Off | EffectKind::Static | EffectKind::Keyboard => Strategy::Once,
                _ => Strategy::Animated,
            },
            Self::K65PlusWireless => Strategy::Offloaded(match kind {
                EffectKind::Rain => trigger::RAIN,
                EffectKind::Tlk => trigger::TLK,
                EffectKind::Tlr => trigger::TLR,
                EffectKind::SpiralRainbow => trigger::SPIRAL_RAINBOW,
                EffectKind::ColorPulse => trigger::COLOR_PULSE,
                EffectKind::ColorShift => trigger::COLOR_SHIFT,
                EffectKind::ColorWave => trigger::COLOR_WAVE,
                EffectKind::RainbowWave => trigger::RAINBOW_WAVE,
                EffectKind::Watercolor => trigger::WATERCOLOR,
                EffectKind::Keyboard => trigger::FILL,
                _ => trigger::OFF,
            }),
        };
        Some(strategy)
    }

    /// Trigger sent on stop to hand lighting back to firmware
    pub fn stop_trigger(&self) -> Option<OffloadTrigger> {
        match self {
            Self::K65Plus => None,
            Self::K65PlusWireless => Some(trigger::WATERCOLOR),
        }
    }

    /// Sleep timer choices in minutes
    pub fn sleep_modes(&self) -> &'static [u32] {
        match self {
            Self::K65Plus => &[],
            Self::K65PlusWireless => &[5, 10, 15, 30, 60],
        }
    }
}

impl fmt::Display for KeyboardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.product_name())
    }
}

impl FromStr for KeyboardModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "k65-plus" => Ok(Self::K65Plus),
            "k65-plus-wireless" => Ok(Self::K65PlusWireless),
            _ => Err(format!("unknown model: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wired_strategies() {
        let m = KeyboardModel::K65Plus;
        assert_eq!(m.strategy(EffectKind::Keyboard), Some(Strategy::Once));
        assert_eq!(m.strategy(EffectKind::ColorShift), Some(Strategy::Animated));
        assert_eq!(m.strategy(EffectKind::Rain), None);
        assert!(m.stop_trigger().is_none());
    }

    #[test]
    fn test_wireless_all_offloaded() {
        let m = KeyboardModel::K65PlusWireless;
        for kind in m.effects() {
            assert!(matches!(m.strategy(*kind), Some(Strategy::Offloaded(_))));
        }
        assert_eq!(m.strategy(EffectKind::Rainbow), None);
    }

    #[test]
    fn test_fill_trigger_payload() {
        let Some(Strategy::Offloaded(t)) = KeyboardModel::K65PlusWireless.strategy(EffectKind::Keyboard)
        else {
            panic!("keyboard is offloaded on wireless");
        };
        let buf = t.payload(Some(&Color::rgb(10, 20, 30)));
        assert_eq!(buf.len(), 93);
        assert_eq!(&buf[3..8], &[0x01, 0xFF, 30, 20, 10]);
    }

    #[test]
    fn test_watercolor_trigger_payload() {
        let t = KeyboardModel::K65PlusWireless.stop_trigger().unwrap();
        let buf = t.payload(None);
        assert_eq!(&buf[..8], &[0, 0, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0]);
        assert_eq!(t.tag, &[0x22, 0x00, 0x03, 0x04]);
    }

    #[test]
    fn test_model_parse() {
        assert_eq!("k65-plus-wireless".parse(), Ok(KeyboardModel::K65PlusWireless));
        assert_eq!(KeyboardModel::from_product_id(product::K65_PLUS), Some(KeyboardModel::K65Plus));
        assert!("k70".parse::<KeyboardModel>().is_err());
    }
}
