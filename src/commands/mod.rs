//! Command handlers for the CLI application.
//!
//! - `query`: read-only commands (list, effects, info)
//! - `run`: the lighting daemon

pub mod query;
pub mod run;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use k65_keyboard::KeyboardModel;
use k65_transport::{DiscoveredDevice, HidDiscovery, HidTransport};

use crate::config::DeviceConfig;

/// Discovery narrowed to the configured vendor, product and interfaces
pub fn discovery(device: &DeviceConfig) -> anyhow::Result<HidDiscovery> {
    let mut discovery = HidDiscovery::new()
        .with_vendor(device.vendor_id)
        .with_interfaces(device.command_interface, device.dial_interface);
    if let Some(pid) = device.product_id {
        discovery = discovery.with_products(vec![pid]);
    } else if let Some(model) = device.model()? {
        discovery = discovery.with_products(vec![model.product_id()]);
    }
    Ok(discovery)
}

/// Pick the keyboard to drive, by serial when one is given
pub fn select_device(
    discovery: &HidDiscovery,
    serial: Option<&str>,
) -> anyhow::Result<DiscoveredDevice> {
    let devices = discovery.list_devices()?;
    let found = match serial {
        Some(serial) => devices
            .into_iter()
            .find(|d| d.serial.as_deref() == Some(serial)),
        None => devices.into_iter().next(),
    };
    found.ok_or_else(|| match serial {
        Some(serial) => anyhow!("no K65 Plus keyboard with serial {} found", serial),
        None => anyhow!("no K65 Plus keyboard found"),
    })
}

/// Resolve the model: configured one wins, otherwise from the product id
pub fn resolve_model(
    device: &DeviceConfig,
    found: &DiscoveredDevice,
) -> anyhow::Result<KeyboardModel> {
    if let Some(model) = device.model()? {
        return Ok(model);
    }
    KeyboardModel::from_product_id(found.pid)
        .ok_or_else(|| anyhow!("unsupported product id {:04x}", found.pid))
}

/// Find, identify and open the command interface
pub fn open_keyboard(
    device: &DeviceConfig,
    serial: Option<&str>,
) -> anyhow::Result<(KeyboardModel, HidDiscovery, HidTransport)> {
    let discovery = discovery(device)?;
    let serial = serial.or(device.serial.as_deref());
    let found = select_device(&discovery, serial)?;
    let model = resolve_model(device, &found)?;
    let transport = discovery
        .open_device(&found, model.transport_type())
        .with_context(|| format!("opening {}", found.path))?;
    Ok((model, discovery, transport))
}

/// Setup Ctrl-C handler and return the running flag
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}
