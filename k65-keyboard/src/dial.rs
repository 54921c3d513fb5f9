//! Control dial listener
//!
//! Reads the dial's input interface on its own thread and turns rotations
//! and presses into volume or brightness changes.

use std::thread::JoinHandle;
use std::time::Duration;

use k65_transport::protocol::{timing, INPUT_REPORT_SIZE};
use k65_transport::{parse_dial_report, DialEvent, InputReader};
use tracing::{debug, error, warn};

use crate::engine::CancelToken;
use crate::error::EngineError;
use crate::profile::{DialBinding, BRIGHTNESS_LEVEL_MAX};

/// Brightness change per dial step
pub const BRIGHTNESS_STEP: u16 = 100;

/// Default volume change per dial step, percent
pub const VOLUME_STEP: u8 = 5;

/// OS volume control
pub trait VolumeControl: Send {
    fn set_mute(&mut self, muted: bool) -> std::io::Result<()>;
    fn adjust_volume(&mut self, step: u8, increase: bool) -> std::io::Result<()>;
}

/// Result of applying one dial event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialAction {
    SetMute(bool),
    AdjustVolume { step: u8, increase: bool },
    SetBrightness(u16),
}

/// Dial state that lives as long as the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialState {
    muted: bool,
    brightness: u16,
    /// Level restored by a press after brightness was toggled off
    remembered: u16,
    volume_step: u8,
}

impl DialState {
    pub fn new(brightness: u16, volume_step: u8) -> Self {
        let brightness = brightness.min(BRIGHTNESS_LEVEL_MAX);
        Self {
            muted: false,
            brightness,
            remembered: if brightness == 0 {
                BRIGHTNESS_LEVEL_MAX
            } else {
                brightness
            },
            volume_step,
        }
    }

    pub fn brightness(&self) -> u16 {
        self.brightness
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Track a brightness change made outside the dial
    pub fn set_brightness(&mut self, level: u16) {
        self.brightness = level.min(BRIGHTNESS_LEVEL_MAX);
        if self.brightness > 0 {
            self.remembered = self.brightness;
        }
    }

    pub fn apply(&mut self, event: DialEvent, binding: DialBinding) -> DialAction {
        match binding {
            DialBinding::Volume => match event {
                DialEvent::Press => {
                    self.muted = !self.muted;
                    DialAction::SetMute(self.muted)
                }
                DialEvent::RotateRight | DialEvent::RotateLeft => DialAction::AdjustVolume {
                    step: self.volume_step,
                    increase: event == DialEvent::RotateRight,
                },
            },
            DialBinding::Brightness => {
                self.brightness = match event {
                    DialEvent::Press if self.brightness > 0 => {
                        self.remembered = self.brightness;
                        0
                    }
                    DialEvent::Press => self.remembered,
                    DialEvent::RotateRight => {
                        (self.brightness + BRIGHTNESS_STEP).min(BRIGHTNESS_LEVEL_MAX)
                    }
                    DialEvent::RotateLeft => self.brightness.saturating_sub(BRIGHTNESS_STEP),
                };
                DialAction::SetBrightness(self.brightness)
            }
        }
    }
}

/// Handle to a running dial listener thread
pub struct DialListener {
    token: CancelToken,
    handle: JoinHandle<()>,
}

impl DialListener {
    /// Spawn the read loop; `handler` runs on the listener thread
    pub fn spawn<F>(mut reader: Box<dyn InputReader>, mut handler: F) -> Result<Self, EngineError>
    where
        F: FnMut(DialEvent) + Send + 'static,
    {
        let token = CancelToken::new();
        let loop_token = token.clone();
        let handle = std::thread::Builder::new()
            .name("k65-dial".into())
            .spawn(move || {
                let pace = Duration::from_millis(timing::DIAL_PACE_MS);
                let mut buf = [0u8; INPUT_REPORT_SIZE];
                debug!("Dial listener started");
                while !loop_token.is_cancelled() {
                    match reader.read_timeout(&mut buf, timing::DIAL_READ_TIMEOUT_MS) {
                        Ok(0) => continue,
                        Ok(n) => {
                            if let Some(event) = parse_dial_report(&buf[..n]) {
                                debug!("Dial event {:?}", event);
                                handler(event);
                            }
                            if loop_token.sleep(pace) {
                                break;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Error reading from dial, listener stopped");
                            break;
                        }
                    }
                }
                debug!("Dial listener exited");
            })
            .map_err(|e| EngineError::Spawn(e.to_string()))?;
        Ok(Self { token, handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop and wait; returns within one read timeout
    pub fn stop(self) {
        self.token.cancel();
        if self.handle.join().is_err() {
            warn!("Dial listener panicked");
        }
    }
}
