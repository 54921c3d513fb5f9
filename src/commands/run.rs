//! Lighting daemon: take over the keyboard until interrupted.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use k65_keyboard::{Collaborators, Keyboard, KeyboardOptions};
use k65_transport::{InputReader, Transport};
use tracing::{info, warn};

use super::{open_keyboard, setup_interrupt_handler};
use crate::config::Config;
use crate::layouts::JsonLayoutCatalog;
use crate::sensors::SystemTemperatures;
use crate::store::JsonProfileStore;
use crate::volume::PactlVolume;

pub fn run(config: &Config, serial: Option<&str>) -> anyhow::Result<()> {
    let running = setup_interrupt_handler();
    let (model, discovery, transport) = open_keyboard(&config.device, serial)?;

    let dial: Option<Box<dyn InputReader>> = match discovery.open_dial(transport.device_info()) {
        Ok(device) => Some(Box::new(device)),
        Err(e) => {
            warn!(error = %e, "Dial interface unavailable, dial disabled");
            None
        }
    };

    let daemon = &config.daemon;
    let store = JsonProfileStore::new(daemon.profiles_dir());
    info!("Profiles in {}", store.dir().display());
    let collaborators = Collaborators {
        store: Arc::new(store),
        layouts: Arc::new(JsonLayoutCatalog::new(daemon.layouts_dir())),
        catalog: Arc::new(config.catalog()),
        temperatures: Some(Box::new(SystemTemperatures::new(
            &daemon.cpu_sensor,
            &daemon.gpu_sensor,
        ))),
        volume: Some(Box::new(PactlVolume)),
        dial,
    };
    let options = KeyboardOptions {
        keep_alive_interval: Duration::from_millis(daemon.keep_alive_ms),
        telemetry_interval: Duration::from_millis(daemon.telemetry_ms),
        volume_step: daemon.volume_step,
        ..Default::default()
    };

    let keyboard = Keyboard::init(model, Arc::new(transport), collaborators, options)?;
    let profile = keyboard.profile();
    info!(
        serial = %keyboard.serial(),
        "Running effect {} on {} (firmware {}), press Ctrl-C to stop",
        profile.rgb_profile,
        profile.label,
        keyboard.current_firmware_version()
    );

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    info!("Shutting down");
    keyboard.stop();
    Ok(())
}
