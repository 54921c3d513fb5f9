//! Animation engine
//!
//! At most one render loop runs per device. The engine moves through
//! `Idle -> Running -> Cancelling -> Idle`; a new loop may only be started
//! from `Idle`, which [`AnimationEngine::replace`] reaches by cancelling the
//! current session and joining its thread before spawning the next one.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::effect::{EffectCatalog, EffectDescriptor, EffectKind};
use crate::error::EngineError;
use crate::model::Strategy;
use crate::profile::{DeviceProfile, ProfileCell};
use crate::render::{render_keyboard, ChannelBuffer, Renderer, TickInput};
use crate::telemetry::TemperatureCache;
use crate::writer::ColorWriter;

/// Cooperative cancellation flag with a wakeable sleep
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock() = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep up to `duration`, returns true if cancelled meanwhile
    pub fn sleep(&self, duration: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut cancelled = flag.lock();
        while !*cancelled {
            if cvar.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }
}

/// Everything a render loop needs, shared with the device
#[derive(Clone)]
pub struct EngineContext {
    pub writer: Arc<ColorWriter>,
    pub profile: ProfileCell,
    pub catalog: Arc<EffectCatalog>,
    pub temperatures: Arc<TemperatureCache>,
}

/// One live render loop
struct AnimationSession {
    kind: EffectKind,
    token: CancelToken,
    handle: JoinHandle<()>,
}

enum EngineState {
    Idle,
    Running(AnimationSession),
    Cancelling(AnimationSession),
}

/// Externally visible engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    Running(EffectKind),
    Cancelling,
}

impl EngineStatus {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running(_) => "running",
            Self::Cancelling => "cancelling",
        }
    }
}

/// What `start` did with the profile's effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A render loop is now running
    Looping(EffectKind),
    /// A single frame was written
    SingleFrame(EffectKind),
    /// Firmware took over after a trigger write
    Offloaded(EffectKind),
    /// Effect unknown or unsupported, all channels were turned off
    Blanked,
}

pub struct AnimationEngine {
    ctx: EngineContext,
    state: EngineState,
}

impl AnimationEngine {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            state: EngineState::Idle,
        }
    }

    pub fn status(&self) -> EngineStatus {
        match &self.state {
            EngineState::Idle => EngineStatus::Idle,
            EngineState::Running(s) => EngineStatus::Running(s.kind),
            EngineState::Cancelling(_) => EngineStatus::Cancelling,
        }
    }

    /// Apply the profile's current effect
    ///
    /// Loops only for host-animated effects; single-frame and firmware
    /// effects are written here and leave the engine idle.
    pub fn start(&mut self) -> Result<StartOutcome, EngineError> {
        let status = self.status();
        if status != EngineStatus::Idle {
            return Err(EngineError::NotIdle {
                requested: "effect",
                state: status.name(),
            });
        }

        let profile = self.ctx.profile.snapshot();
        let model = self.ctx.writer.model();

        if model.resets_before_apply() {
            if let Err(e) = self.ctx.writer.write_reset() {
                warn!(serial = %profile.serial, error = %e, "Unable to reset colors");
            }
        }

        let kind = EffectKind::from_name(&profile.rgb_profile);
        let strategy = kind.and_then(|k| model.strategy(k));
        let (Some(kind), Some(strategy)) = (kind, strategy) else {
            warn!(
                serial = %profile.serial,
                profile = %profile.rgb_profile,
                "Effect not available on {}, turning lights off",
                model
            );
            self.write_blank(&profile);
            return Ok(StartOutcome::Blanked);
        };

        match strategy {
            Strategy::Offloaded(trigger) => {
                let color = profile.current_keyboard().map(|k| &k.color);
                if let Err(e) = self.ctx.writer.write_trigger(&trigger, color) {
                    warn!(serial = %profile.serial, error = %e, "Unable to send effect trigger");
                }
                info!("Effect {} handed to firmware", kind);
                Ok(StartOutcome::Offloaded(kind))
            }
            Strategy::Once => {
                let frame = match render_frame(&self.ctx, &profile, &mut None, Instant::now()) {
                    Some(frame) => frame,
                    None => blank(&self.ctx),
                };
                if let Err(e) = self.ctx.writer.write_channels(&frame) {
                    warn!(serial = %profile.serial, error = %e, "Unable to write colors");
                }
                debug!("Effect {} written once", kind);
                Ok(StartOutcome::SingleFrame(kind))
            }
            Strategy::Animated => {
                let token = CancelToken::new();
                let ctx = self.ctx.clone();
                let loop_token = token.clone();
                let handle = std::thread::Builder::new()
                    .name(format!("k65-render-{}", kind))
                    .spawn(move || run_render_loop(ctx, loop_token))
                    .map_err(|e| EngineError::Spawn(e.to_string()))?;
                info!("Effect {} started", kind);
                self.state = EngineState::Running(AnimationSession {
                    kind,
                    token,
                    handle,
                });
                Ok(StartOutcome::Looping(kind))
            }
        }
    }

    /// Signal the running loop to stop after its current frame
    pub fn cancel(&mut self) -> Result<(), EngineError> {
        match std::mem::replace(&mut self.state, EngineState::Idle) {
            EngineState::Running(session) => {
                debug!("Cancelling effect {}", session.kind);
                session.token.cancel();
                self.state = EngineState::Cancelling(session);
                Ok(())
            }
            other => {
                self.state = other;
                Err(EngineError::NotRunning(self.status().name()))
            }
        }
    }

    /// Block until a cancelled loop has exited
    pub fn wait(&mut self) {
        if let EngineState::Cancelling(session) =
            std::mem::replace(&mut self.state, EngineState::Idle)
        {
            if session.handle.join().is_err() {
                warn!("Render loop for {} panicked", session.kind);
            }
            debug!("Effect {} stopped", session.kind);
        }
    }

    /// Stop whatever runs, wait for it, and go idle
    pub fn halt(&mut self) {
        if matches!(self.state, EngineState::Running(_)) {
            let _ = self.cancel();
        }
        self.wait();
    }

    fn write_blank(&self, profile: &DeviceProfile) {
        let model = self.ctx.writer.model();
        let result = match model.strategy(EffectKind::Off) {
            Some(Strategy::Offloaded(trigger)) => self.ctx.writer.write_trigger(&trigger, None),
            _ => self.ctx.writer.write_channels(&blank(&self.ctx)),
        };
        if let Err(e) = result {
            warn!(serial = %profile.serial, error = %e, "Unable to turn lights off");
        }
    }

    /// Stop the current session, then start the profile's effect
    pub fn replace(&mut self) -> Result<StartOutcome, EngineError> {
        self.halt();
        self.start()
    }
}

impl Drop for AnimationEngine {
    fn drop(&mut self) {
        self.halt();
    }
}

fn blank(ctx: &EngineContext) -> Vec<u8> {
    ChannelBuffer::off(ctx.writer.model().led_channels()).to_payload()
}

/// Render the profile's effect, `None` if it cannot be resolved
fn render_frame(
    ctx: &EngineContext,
    profile: &DeviceProfile,
    renderer: &mut Option<Renderer>,
    started: Instant,
) -> Option<Vec<u8>> {
    let model = ctx.writer.model();
    let desc = EffectDescriptor::resolve(&profile.rgb_profile, &ctx.catalog)?;
    if desc.kind == EffectKind::Keyboard {
        let map = profile.current_keyboard()?;
        return Some(render_keyboard(map, model.color_packet_length()));
    }
    let desc = match profile.brightness.value() {
        Some(b) => desc.with_brightness(b),
        None => desc,
    };
    let renderer = renderer.get_or_insert_with(|| Renderer::new(model.led_channels()));
    let input = TickInput {
        elapsed: started.elapsed().as_secs_f64(),
        temperatures: ctx.temperatures.get(),
    };
    Some(renderer.render(&desc, &input).to_payload())
}

fn run_render_loop(ctx: EngineContext, token: CancelToken) {
    let tick = ctx.writer.model().tick();
    let started = Instant::now();
    let mut renderer = None;
    let mut warned = false;
    debug!("Render loop started");

    while !token.is_cancelled() {
        // Snapshot once per tick
        let profile = ctx.profile.snapshot();
        let frame = match render_frame(&ctx, &profile, &mut renderer, started) {
            Some(frame) => {
                warned = false;
                frame
            }
            None => {
                if !warned {
                    warn!(
                        serial = %profile.serial,
                        profile = %profile.rgb_profile,
                        "No such RGB profile, rendering off"
                    );
                    warned = true;
                }
                blank(&ctx)
            }
        };

        if let Err(e) = ctx.writer.write_channels(&frame) {
            debug!("Frame dropped: {}", e);
        }

        if token.sleep(tick) {
            break;
        }
    }
    debug!("Render loop exited");
}
