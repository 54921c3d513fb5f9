//! Keyboard device: init sequence, exposed operations and profile mutations

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use k65_transport::protocol::{self, cmd, timing};
use k65_transport::{DialEvent, InputReader, Target, Transport};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::color::Color;
use crate::dial::{DialAction, DialListener, DialState, VolumeControl, VOLUME_STEP};
use crate::effect::{EffectCatalog, EffectKind};
use crate::engine::{AnimationEngine, EngineContext, EngineStatus, StartOutcome};
use crate::error::KeyboardError;
use crate::layout::{keyboard_from_layout, layout_key, LayoutCatalog};
use crate::model::KeyboardModel;
use crate::profile::{
    BrightnessMode, DeviceProfile, DialBinding, KeyScope, KeyboardMap, ProfileCell, ProfileStore,
    BRIGHTNESS_LEVEL_MAX, DEFAULT_KEYBOARD,
};
use crate::scheduler::Scheduler;
use crate::telemetry::{TemperatureCache, TemperatureSource};
use crate::writer::ColorWriter;

/// Layout given to a brand new profile
pub const DEFAULT_LAYOUT: &str = "US";

/// Tunables of a keyboard instance
#[derive(Debug, Clone)]
pub struct KeyboardOptions {
    pub keep_alive_interval: Duration,
    pub telemetry_interval: Duration,
    /// Wait after LED activation before sending colors
    pub led_settle: Duration,
    pub volume_step: u8,
}

impl Default for KeyboardOptions {
    fn default() -> Self {
        Self {
            keep_alive_interval: Duration::from_millis(timing::KEEP_ALIVE_MS),
            telemetry_interval: Duration::from_millis(timing::TELEMETRY_MS),
            led_settle: Duration::from_millis(timing::LED_SETTLE_MS),
            volume_step: VOLUME_STEP,
        }
    }
}

/// External collaborators handed to [`Keyboard::init`]
pub struct Collaborators {
    pub store: Arc<dyn ProfileStore>,
    pub layouts: Arc<dyn LayoutCatalog>,
    pub catalog: Arc<EffectCatalog>,
    pub temperatures: Option<Box<dyn TemperatureSource>>,
    pub volume: Option<Box<dyn VolumeControl>>,
    /// Dial input interface, no listener without it
    pub dial: Option<Box<dyn InputReader>>,
}

/// Identity strings read at open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub manufacturer: String,
    pub product: String,
    pub serial: String,
}

/// A K65 Plus keyboard in software-controlled mode
pub struct Keyboard {
    model: KeyboardModel,
    transport: Arc<dyn Transport>,
    identity: DeviceIdentity,
    firmware: String,
    dongle_firmware: Option<String>,
    profile: ProfileCell,
    store: Arc<dyn ProfileStore>,
    layouts: Arc<dyn LayoutCatalog>,
    temperatures: Arc<TemperatureCache>,
    engine: Mutex<AnimationEngine>,
    scheduler: Mutex<Scheduler>,
    dial: Mutex<Option<DialListener>>,
    dial_state: Arc<Mutex<DialState>>,
    /// Held across mutate-and-save so the store never goes back in time
    persist: Arc<Mutex<()>>,
    stopped: AtomicBool,
}

impl Keyboard {
    /// Bring the keyboard into software mode and start all background tasks
    ///
    /// Any failure before the keyboard is fully up stops what was already
    /// started and returns the error.
    pub fn init(
        model: KeyboardModel,
        transport: Arc<dyn Transport>,
        collaborators: Collaborators,
        options: KeyboardOptions,
    ) -> Result<Self, KeyboardError> {
        let Collaborators {
            store,
            layouts,
            catalog,
            temperatures: temperature_source,
            volume,
            dial,
        } = collaborators;

        let info = transport.device_info();
        let identity = DeviceIdentity {
            manufacturer: info.manufacturer.clone(),
            product: info.product_name.clone(),
            serial: info.serial.clone(),
        };
        if identity.serial.is_empty() {
            return Err(KeyboardError::UnexpectedResponse(
                "device reports no serial number".into(),
            ));
        }
        info!(serial = %identity.serial, "Initializing {}", model);

        set_mode(transport.as_ref(), model.mode_targets(), cmd::SOFTWARE_MODE)?;
        transport.transfer(model.activate_led(), &[], Target::Keyboard)?;
        std::thread::sleep(options.led_settle);

        let firmware = read_firmware(transport.as_ref(), Target::Keyboard)?;
        let dongle_firmware = if model.is_wireless() {
            Some(read_firmware(transport.as_ref(), Target::Dongle)?)
        } else {
            None
        };
        info!(serial = %identity.serial, "Firmware {}", firmware);

        let profile = match store.load(&identity.serial)? {
            Some(profile) => profile,
            None => {
                warn!(serial = %identity.serial, "No profile found for device, creating one");
                let keyboard = default_keyboard(layouts.as_ref(), model, DEFAULT_LAYOUT);
                DeviceProfile::new(&identity.product, &identity.serial, DEFAULT_LAYOUT, keyboard)
            }
        };
        store.save(&profile)?;
        let dial_state = DialState::new(profile.brightness_level, options.volume_step);
        let profile = ProfileCell::new(profile);

        let temperatures = Arc::new(TemperatureCache::new());
        let writer = Arc::new(ColorWriter::new(Arc::clone(&transport), model));
        let engine = AnimationEngine::new(EngineContext {
            writer,
            profile: profile.clone(),
            catalog,
            temperatures: Arc::clone(&temperatures),
        });

        let keyboard = Self {
            model,
            transport,
            identity,
            firmware,
            dongle_firmware,
            profile,
            store,
            layouts,
            temperatures,
            engine: Mutex::new(engine),
            scheduler: Mutex::new(Scheduler::new()),
            dial: Mutex::new(None),
            dial_state: Arc::new(Mutex::new(dial_state)),
            persist: Arc::new(Mutex::new(())),
            stopped: AtomicBool::new(false),
        };

        // From here on dropping `keyboard` tears down whatever was started
        {
            let mut scheduler = keyboard.scheduler.lock();
            if let Some(source) = temperature_source {
                scheduler.start_telemetry(
                    source,
                    Arc::clone(&keyboard.temperatures),
                    options.telemetry_interval,
                )?;
            }
            scheduler.start_keep_alive(
                Arc::clone(&keyboard.transport),
                model.keep_alive_targets(),
                options.keep_alive_interval,
            )?;
        }
        keyboard.engine.lock().start()?;
        if let Some(reader) = dial {
            keyboard.start_dial(reader, volume)?;
        }
        keyboard.send_brightness_logged(keyboard.profile.snapshot().brightness_level);
        if model.has_sleep_timer() {
            if let Err(e) = keyboard.send_sleep_timer(keyboard.profile.snapshot().sleep_mode) {
                warn!(serial = %keyboard.identity.serial, error = %e, "Unable to set sleep timer");
            }
        }
        info!(serial = %keyboard.identity.serial, "{} ready", model);
        Ok(keyboard)
    }

    fn start_dial(
        &self,
        reader: Box<dyn InputReader>,
        mut volume: Option<Box<dyn VolumeControl>>,
    ) -> Result<(), KeyboardError> {
        let transport = Arc::clone(&self.transport);
        let profile = self.profile.clone();
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.dial_state);
        let persist = Arc::clone(&self.persist);
        let serial = self.identity.serial.clone();

        let listener = DialListener::spawn(reader, move |event: DialEvent| {
            let binding = profile.snapshot().control_dial;
            let action = state.lock().apply(event, binding);
            match action {
                DialAction::SetMute(muted) => {
                    let Some(volume) = volume.as_mut() else { return };
                    if let Err(e) = volume.set_mute(muted) {
                        warn!(serial = %serial, error = %e, "Unable to change mute state");
                    }
                }
                DialAction::AdjustVolume { step, increase } => {
                    let Some(volume) = volume.as_mut() else { return };
                    if let Err(e) = volume.adjust_volume(step, increase) {
                        warn!(serial = %serial, error = %e, "Unable to change volume level");
                    }
                }
                DialAction::SetBrightness(level) => {
                    let saved = commit_profile(&profile, store.as_ref(), &persist, |p| {
                        p.brightness_level = level
                    });
                    if let Err(e) = saved {
                        warn!(serial = %serial, error = %e, "Unable to save profile");
                    }
                    if let Err(e) = send_brightness(transport.as_ref(), level) {
                        warn!(serial = %serial, error = %e, "Unable to change brightness");
                    }
                }
            }
        })?;
        *self.dial.lock() = Some(listener);
        Ok(())
    }

    pub fn model(&self) -> KeyboardModel {
        self.model
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn serial(&self) -> &str {
        &self.identity.serial
    }

    /// Firmware version read at init, `major.minor.patch`
    pub fn current_firmware_version(&self) -> &str {
        &self.firmware
    }

    /// Dongle firmware version, wireless model only
    pub fn dongle_firmware_version(&self) -> Option<&str> {
        self.dongle_firmware.as_deref()
    }

    /// Current profile snapshot
    pub fn profile(&self) -> Arc<DeviceProfile> {
        self.profile.snapshot()
    }

    pub fn engine_status(&self) -> EngineStatus {
        self.engine.lock().status()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<(), KeyboardError> {
        if self.is_stopped() {
            return Err(KeyboardError::NotSupported("keyboard is stopped".into()));
        }
        Ok(())
    }

    /// Replace the profile, sync its brightness and render its effect
    pub fn apply_effect(&self, profile: DeviceProfile) -> Result<StartOutcome, KeyboardError> {
        self.ensure_running()?;
        if profile.serial != self.identity.serial {
            return Err(KeyboardError::InvalidParameter(format!(
                "profile belongs to {}",
                profile.serial
            )));
        }
        let level = profile.brightness_level.min(BRIGHTNESS_LEVEL_MAX);
        {
            let _persist = self.persist.lock();
            self.store.save(&profile)?;
            self.profile.replace(profile);
            self.dial_state.lock().set_brightness(level);
        }
        self.send_brightness_logged(level);
        self.restart_effect()
    }

    /// Set the hardware brightness register (0-1000)
    pub fn apply_brightness(&self, level: u16) -> Result<(), KeyboardError> {
        self.ensure_running()?;
        let level = level.min(BRIGHTNESS_LEVEL_MAX);
        self.commit(|p| p.brightness_level = level)?;
        self.dial_state.lock().set_brightness(level);
        send_brightness(self.transport.as_ref(), level)
    }

    /// Stop background work and hand the keyboard back to its firmware
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(serial = %self.identity.serial, "Stopping device...");
        self.stop_background();

        if let Some(trigger) = self.model.stop_trigger() {
            let writer = ColorWriter::new(Arc::clone(&self.transport), self.model);
            if let Err(e) = writer.write_trigger(&trigger, None) {
                warn!(serial = %self.identity.serial, error = %e, "Unable to restore firmware effect");
            }
        }

        let targets: Vec<Target> = self.model.mode_targets().iter().rev().copied().collect();
        if let Err(e) = set_mode(self.transport.as_ref(), &targets, cmd::HARDWARE_MODE) {
            warn!(serial = %self.identity.serial, error = %e, "Unable to change device mode");
        }
    }

    fn stop_background(&self) {
        self.engine.lock().halt();
        self.scheduler.lock().stop_all();
        if let Some(listener) = self.dial.lock().take() {
            listener.stop();
        }
    }

    fn restart_effect(&self) -> Result<StartOutcome, KeyboardError> {
        Ok(self.engine.lock().replace()?)
    }

    /// Mutate the profile and persist it
    fn commit<R>(&self, f: impl FnOnce(&mut DeviceProfile) -> R) -> Result<R, KeyboardError> {
        commit_profile(&self.profile, self.store.as_ref(), &self.persist, f)
    }

    pub fn update_rgb_profile(&self, name: &str) -> Result<StartOutcome, KeyboardError> {
        self.ensure_running()?;
        match EffectKind::from_name(name) {
            Some(kind) if self.model.supports(kind) => {}
            _ => {
                warn!(serial = %self.identity.serial, profile = name, "Non-existing RGB profile");
                return Err(KeyboardError::InvalidParameter(format!(
                    "effect {} is not available on {}",
                    name, self.model
                )));
            }
        }
        self.commit(|p| p.rgb_profile = name.to_string())?;
        self.restart_effect()
    }

    pub fn change_brightness_mode(&self, mode: BrightnessMode) -> Result<StartOutcome, KeyboardError> {
        self.ensure_running()?;
        self.commit(|p| p.brightness = mode)?;
        self.restart_effect()
    }

    pub fn update_key_color(&self, scope: KeyScope, color: Color) -> Result<StartOutcome, KeyboardError> {
        self.ensure_running()?;
        if self.model.is_wireless() && scope != KeyScope::All {
            return Err(KeyboardError::NotSupported(
                "per-key colors on the wireless model".into(),
            ));
        }
        let updated = self.commit(|p| {
            p.current_keyboard_mut()
                .is_some_and(|map| map.set_color(scope, color))
        })?;
        if !updated {
            return Err(KeyboardError::InvalidParameter(format!("no key for {:?}", scope)));
        }
        self.restart_effect()
    }

    /// Make another stored keyboard map the active one
    pub fn switch_keyboard_profile(&self, name: &str) -> Result<StartOutcome, KeyboardError> {
        self.ensure_running()?;
        let known = self.commit(|p| {
            if p.keyboards.contains_key(name) && p.profiles.iter().any(|n| n == name) {
                p.profile = name.to_string();
                true
            } else {
                false
            }
        })?;
        if !known {
            return Err(KeyboardError::InvalidParameter(format!(
                "no keyboard profile {}",
                name
            )));
        }
        self.restart_effect()
    }

    /// Store a copy of the active keyboard map under a new name
    pub fn save_keyboard_profile(&self, name: &str) -> Result<(), KeyboardError> {
        self.ensure_running()?;
        let created = self.commit(|p| {
            if p.keyboards.contains_key(name) || p.profiles.iter().any(|n| n == name) {
                return false;
            }
            let Some(current) = p.current_keyboard().cloned() else {
                return false;
            };
            p.keyboards.insert(name.to_string(), current);
            p.profiles.push(name.to_string());
            true
        })?;
        if !created {
            return Err(KeyboardError::InvalidParameter(format!(
                "keyboard profile {} exists",
                name
            )));
        }
        Ok(())
    }

    /// Remove a keyboard map; the default map cannot be deleted
    pub fn delete_keyboard_profile(&self, name: &str) -> Result<StartOutcome, KeyboardError> {
        self.ensure_running()?;
        if name == DEFAULT_KEYBOARD {
            return Err(KeyboardError::InvalidParameter(
                "the default keyboard profile cannot be deleted".into(),
            ));
        }
        let removed = self.commit(|p| {
            if p.keyboards.remove(name).is_none() {
                return false;
            }
            p.profiles.retain(|n| n != name);
            p.profile = DEFAULT_KEYBOARD.to_string();
            true
        })?;
        if !removed {
            return Err(KeyboardError::InvalidParameter(format!(
                "no keyboard profile {}",
                name
            )));
        }
        self.restart_effect()
    }

    /// Rebuild the default keyboard map from another catalog layout
    pub fn change_keyboard_layout(&self, layout: &str) -> Result<(), KeyboardError> {
        self.ensure_running()?;
        if !self
            .layouts
            .layouts(self.model.layout_key())
            .iter()
            .any(|l| l == layout)
        {
            return Err(KeyboardError::InvalidParameter(format!("no such layout {}", layout)));
        }
        let positions = self
            .layouts
            .key_packet_offsets(&layout_key(self.model.layout_key(), layout))
            .ok_or_else(|| KeyboardError::NotSupported(format!("layout {} has no key data", layout)))?;
        let map = keyboard_from_layout(layout, positions, Color::rgb(255, 255, 255));
        self.commit(|p| {
            p.keyboards.insert(DEFAULT_KEYBOARD.to_string(), map);
            p.layout = layout.to_string();
        })
    }

    pub fn update_control_dial(&self, binding: DialBinding) -> Result<(), KeyboardError> {
        self.ensure_running()?;
        self.commit(|p| p.control_dial = binding)
    }

    pub fn update_label(&self, label: &str) -> Result<(), KeyboardError> {
        self.ensure_running()?;
        self.commit(|p| p.label = label.to_string())
    }

    /// Minutes of inactivity before sleep, wireless model only
    pub fn update_sleep_timer(&self, minutes: u32) -> Result<(), KeyboardError> {
        self.ensure_running()?;
        if !self.model.has_sleep_timer() {
            return Err(KeyboardError::NotSupported("sleep timer".into()));
        }
        if minutes == 0 {
            return Err(KeyboardError::InvalidParameter("sleep timer must be positive".into()));
        }
        self.commit(|p| p.sleep_mode = minutes)?;
        self.send_sleep_timer(minutes)
    }

    fn send_sleep_timer(&self, minutes: u32) -> Result<(), KeyboardError> {
        self.transport.transfer(
            cmd::SLEEP_TIMER,
            &protocol::sleep_payload(minutes),
            Target::Keyboard,
        )?;
        debug!("Sleep timer set to {} minutes", minutes);
        Ok(())
    }

    fn send_brightness_logged(&self, level: u16) {
        if let Err(e) = send_brightness(self.transport.as_ref(), level) {
            warn!(serial = %self.identity.serial, error = %e, "Unable to change brightness");
        }
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        self.stop_background();
    }
}

fn set_mode(transport: &dyn Transport, targets: &[Target], mode: &[u8]) -> Result<(), KeyboardError> {
    for &target in targets {
        transport.transfer(mode, &[], target)?;
    }
    Ok(())
}

fn commit_profile<R>(
    profile: &ProfileCell,
    store: &dyn ProfileStore,
    persist: &Mutex<()>,
    f: impl FnOnce(&mut DeviceProfile) -> R,
) -> Result<R, KeyboardError> {
    let _persist = persist.lock();
    let (result, snapshot) = profile.update(f);
    store.save(&snapshot)?;
    Ok(result)
}

fn read_firmware(transport: &dyn Transport, target: Target) -> Result<String, KeyboardError> {
    let resp = transport.transfer(cmd::GET_FIRMWARE, &[], target)?;
    protocol::parse_firmware(&resp)
        .map_err(|e| KeyboardError::UnexpectedResponse(format!("firmware reply: {}", e)))
}

fn send_brightness(transport: &dyn Transport, level: u16) -> Result<(), KeyboardError> {
    transport.transfer(
        cmd::BRIGHTNESS,
        &protocol::brightness_payload(level),
        Target::Keyboard,
    )?;
    Ok(())
}

/// Keyboard map for a new profile, empty when the catalog lacks the layout
fn default_keyboard(layouts: &dyn LayoutCatalog, model: KeyboardModel, layout: &str) -> KeyboardMap {
    match layouts.key_packet_offsets(&layout_key(model.layout_key(), layout)) {
        Some(positions) => keyboard_from_layout(layout, positions, Color::rgb(255, 255, 255)),
        None => {
            warn!("Layout {} not found in catalog, starting with an empty key map", layout);
            KeyboardMap {
                layout: layout.to_string(),
                color: Color::rgb(255, 255, 255),
                ..Default::default()
            }
        }
    }
}
