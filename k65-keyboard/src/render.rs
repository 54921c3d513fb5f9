//! Per-effect frame rendering
//!
//! A [`Renderer`] holds everything that must survive between ticks of one
//! animation session: phase counters, the drifting start/end colors and the
//! last temperature color. Each tick produces a fresh [`ChannelBuffer`].

use std::f64::consts::PI;

use rand::Rng;

use crate::color::{hsb_to_rgb, lerp_color, modify_brightness, random_color, Color};
use crate::effect::{EffectDescriptor, EffectKind};
use crate::profile::KeyboardMap;
use crate::telemetry::Temperatures;

/// Channels lit behind the head of a circle
const CIRCLE_TAIL: usize = 5;
/// Arms of the spinner
const SPINNER_ARMS: usize = 3;
/// Chance per channel per tick of a storm flash
const STORM_FLASH_CHANCE: f64 = 0.04;
/// Wave phase advance per tick
const WAVE_STEP: f64 = 0.2;

/// One color per LED channel, brightness already applied
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBuffer(Vec<Color>);

impl ChannelBuffer {
    pub fn off(channels: usize) -> Self {
        Self(vec![Color::BLACK; channels])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.0
    }

    /// Channel triples as sent on the wire
    pub fn to_payload(&self) -> Vec<u8> {
        self.0.iter().flat_map(|c| c.to_bytes()).collect()
    }
}

/// Inputs that change every tick
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    /// Seconds since the session started
    pub elapsed: f64,
    pub temperatures: Temperatures,
}

/// Phase counters, one per effect family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub colorpulse: u32,
    pub flickering: u32,
    pub colorshift: u32,
    pub colorwarp: u32,
    pub circle: usize,
    pub circleshift: usize,
    pub spinner: usize,
    pub cpu_temperature: u32,
    pub gpu_temperature: u32,
    pub rotator_hue: u32,
}

/// Render state of one animation session
#[derive(Debug, Clone)]
pub struct Renderer {
    channels: usize,
    current: Option<EffectKind>,
    counters: Counters,
    reverse: bool,
    wave_position: f64,
    /// Random colors used when the effect has no explicit pair
    start: Color,
    end: Color,
    temperature_color: Option<Color>,
    flicker_mask: Vec<bool>,
}

impl Renderer {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            current: None,
            counters: Counters::default(),
            reverse: false,
            wave_position: 0.0,
            start: random_color(1.0),
            end: random_color(1.0),
            temperature_color: None,
            flicker_mask: vec![false; channels],
        }
    }

    /// Seed the drifting colors instead of drawing random ones
    pub fn with_colors(mut self, start: Color, end: Color) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    pub fn drift_colors(&self) -> (Color, Color) {
        (self.start, self.end)
    }

    /// Reset every counter when the effect changes
    fn observe(&mut self, kind: EffectKind) {
        if self.current != Some(kind) {
            self.current = Some(kind);
            self.counters = Counters::default();
            self.reverse = false;
            self.wave_position = 0.0;
            self.temperature_color = None;
            self.flicker_mask = vec![false; self.channels];
        }
    }

    /// Render one frame of a host-rendered effect
    pub fn render(&mut self, desc: &EffectDescriptor, input: &TickInput) -> ChannelBuffer {
        self.observe(desc.kind);
        let n = self.channels;
        let b = desc.brightness;
        let (start, end) = match desc.colors {
            Some((s, e)) => (s.with_brightness(b), e.with_brightness(b)),
            None => (self.start.with_brightness(b), self.end.with_brightness(b)),
        };
        let smoothness = desc.smoothness.max(1);

        let colors = match desc.kind {
            EffectKind::Off => vec![Color::BLACK; n],
            EffectKind::Static => vec![start; n],
            EffectKind::Rainbow => spectrum(n, input.elapsed * desc.speed, 1.0, b),
            EffectKind::Watercolor => spectrum(n, input.elapsed * desc.speed, 0.4, b),
            EffectKind::ColorPulse => {
                let c = &mut self.counters.colorpulse;
                *c += 1;
                if *c >= smoothness {
                    *c = 0;
                }
                let t = f64::from(*c) / f64::from(smoothness);
                let pulse = (PI * t).sin();
                vec![lerp_color(&start, &end, t).with_brightness(b * pulse); n]
            }
            EffectKind::ColorShift => {
                let t = f64::from(self.counters.colorshift) / f64::from(smoothness);
                let color = if self.reverse {
                    lerp_color(&end, &start, t)
                } else {
                    lerp_color(&start, &end, t)
                };
                self.counters.colorshift += 1;
                if self.counters.colorshift >= smoothness {
                    self.counters.colorshift = 0;
                    self.reverse = !self.reverse;
                }
                vec![color; n]
            }
            EffectKind::ColorWarp => {
                let (from, to) = (self.start.with_brightness(b), self.end.with_brightness(b));
                let t = f64::from(self.counters.colorwarp) / f64::from(smoothness);
                let color = lerp_color(&from, &to, t);
                self.counters.colorwarp += 1;
                if self.counters.colorwarp >= smoothness {
                    self.counters.colorwarp = 0;
                    self.reverse = !self.reverse;
                    self.start = self.end;
                    self.end = random_color(1.0);
                }
                vec![color; n]
            }
            EffectKind::Wave => {
                let position = self.wave_position;
                self.wave_position += WAVE_STEP;
                (0..n)
                    .map(|i| {
                        let phase = i as f64 / n.max(1) as f64 * 2.0 * PI * 3.0 - position;
                        lerp_color(&start, &end, (phase.sin() + 1.0) / 2.0)
                    })
                    .collect()
            }
            EffectKind::Storm => {
                let mut rng = rand::rng();
                let dim = end.with_brightness(b * 0.15);
                (0..n)
                    .map(|_| {
                        if rng.random_bool(STORM_FLASH_CHANCE) {
                            start
                        } else {
                            dim
                        }
                    })
                    .collect()
            }
            EffectKind::Flickering => {
                let c = &mut self.counters.flickering;
                if *c >= smoothness {
                    *c = 0;
                } else {
                    *c += 1;
                }
                if *c == 0 {
                    let mut rng = rand::rng();
                    self.flicker_mask = (0..n).map(|_| rng.random_bool(0.5)).collect();
                }
                self.flicker_mask
                    .iter()
                    .map(|&on| if on { start } else { end })
                    .collect()
            }
            EffectKind::Circle => {
                let head = advance_wrapping(&mut self.counters.circle, n);
                circle(n, head, &start, &end)
            }
            EffectKind::CircleShift => {
                let head = advance_wrapping(&mut self.counters.circleshift, n);
                circle(n, head, &start, &end)
            }
            EffectKind::Spinner => {
                let head = advance_wrapping(&mut self.counters.spinner, n);
                let step = (n / SPINNER_ARMS).max(1);
                (0..n)
                    .map(|i| {
                        let lit = (0..SPINNER_ARMS).any(|arm| (head + arm * step) % n == i);
                        if lit {
                            start
                        } else {
                            end
                        }
                    })
                    .collect()
            }
            EffectKind::Rotator => {
                let hue = self.counters.rotator_hue;
                self.counters.rotator_hue = (hue + 1) % 360;
                (0..n)
                    .map(|i| {
                        let (r, g, bl) =
                            hsb_to_rgb(f64::from(hue) + i as f64 * 360.0 / n.max(1) as f64, 1.0, 1.0);
                        Color::rgb(r, g, bl).with_brightness(b)
                    })
                    .collect()
            }
            EffectKind::CpuTemperature | EffectKind::GpuTemperature => {
                let (counter, temp) = if desc.kind == EffectKind::CpuTemperature {
                    (&mut self.counters.cpu_temperature, input.temperatures.cpu)
                } else {
                    (&mut self.counters.gpu_temperature, input.temperatures.gpu)
                };
                *counter += 1;
                if *counter >= smoothness {
                    *counter = 0;
                }
                let step = f64::from(*counter + 1) / f64::from(smoothness);
                let target = lerp_color(
                    &start,
                    &end,
                    normalize(f64::from(temp), desc.min_temp, desc.max_temp),
                );
                let previous = self.temperature_color.unwrap_or(start);
                let color = lerp_color(&previous, &target, step).with_brightness(b);
                self.temperature_color = Some(color);
                vec![color; n]
            }
            // Not host rendered
            EffectKind::Keyboard
            | EffectKind::Rain
            | EffectKind::Tlk
            | EffectKind::Tlr
            | EffectKind::SpiralRainbow
            | EffectKind::RainbowWave
            | EffectKind::ColorWave => vec![Color::BLACK; n],
        };

        ChannelBuffer(colors.into_iter().map(modify_brightness).collect())
    }
}

/// Per-key frame for the "keyboard" effect; keys without offsets stay off
pub fn render_keyboard(map: &KeyboardMap, packet_length: usize) -> Vec<u8> {
    let mut buf = vec![0u8; packet_length];
    for key in map.keys.values() {
        let rgb = key.color.to_bytes();
        for &index in &key.packet_index {
            if let Some(slot) = buf.get_mut(index..index + 3) {
                slot.copy_from_slice(&rgb);
            }
        }
    }
    buf
}

/// Advance a counter that wraps at `limit` and return the new value
fn advance_wrapping(counter: &mut usize, limit: usize) -> usize {
    if *counter >= limit {
        *counter = 0;
    } else {
        *counter += 1;
    }
    *counter
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return if value >= max { 1.0 } else { 0.0 };
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Hue sweep across channels, scrolling with `elapsed`
fn spectrum(n: usize, elapsed: f64, saturation: f64, brightness: f64) -> Vec<Color> {
    (0..n)
        .map(|i| {
            let position = (i as f64 / n.max(1) as f64 + elapsed / 4.0).rem_euclid(1.0);
            let (r, g, b) = hsb_to_rgb(position * 360.0, saturation, 1.0);
            Color::rgb(r, g, b).with_brightness(brightness)
        })
        .collect()
}

fn circle(n: usize, head: usize, start: &Color, end: &Color) -> Vec<Color> {
    (0..n)
        .map(|i| {
            let distance = (head + n - i) % n;
            if distance < CIRCLE_TAIL {
                lerp_color(start, end, distance as f64 / CIRCLE_TAIL as f64)
            } else {
                *end
            }
        })
        .collect()
}
