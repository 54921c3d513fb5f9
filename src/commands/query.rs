//! Query (read-only) command handlers.

use k65_keyboard::{KeyboardModel, Strategy};
use k65_transport::protocol::{cmd, parse_firmware, product};
use k65_transport::{Target, Transport};

use super::{discovery, open_keyboard};
use crate::config::DeviceConfig;

/// List connected keyboards
pub fn list(device: &DeviceConfig, json: bool) -> anyhow::Result<()> {
    let devices = discovery(device)?.list_devices()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }
    if devices.is_empty() {
        println!("No K65 Plus keyboards found");
        return Ok(());
    }
    for d in &devices {
        let model = KeyboardModel::from_product_id(d.pid)
            .map(|m| m.product_name())
            .unwrap_or("unknown");
        println!(
            "{:04x}:{:04x}  {:<20} serial {:<16} {}",
            d.vid,
            d.pid,
            model,
            d.serial.as_deref().unwrap_or("-"),
            d.path
        );
    }
    Ok(())
}

/// List effect names for the given, configured, or every model
pub fn effects(device: &DeviceConfig, model: Option<&str>) -> anyhow::Result<()> {
    let models = match model {
        Some(m) => vec![m.parse::<KeyboardModel>().map_err(anyhow::Error::msg)?],
        None => match device.model()? {
            Some(m) => vec![m],
            None => [product::K65_PLUS, product::K65_PLUS_WIRELESS]
                .into_iter()
                .filter_map(KeyboardModel::from_product_id)
                .collect(),
        },
    };
    for model in models {
        println!("{} ({}):", model.product_name(), model);
        for &kind in model.effects() {
            let how = match model.strategy(kind) {
                Some(Strategy::Animated) => "animated",
                Some(Strategy::Once) => "static",
                Some(Strategy::Offloaded(_)) => "firmware",
                None => continue,
            };
            println!("  {:<16} {:<18} {}", kind.name(), kind.label(), how);
        }
    }
    Ok(())
}

/// Show identity and firmware without taking over the lighting
pub fn info(device: &DeviceConfig, serial: Option<&str>) -> anyhow::Result<()> {
    let (model, _, transport) = open_keyboard(device, serial)?;
    let info = transport.device_info();
    println!("Model:        {}", model.product_name());
    println!("Manufacturer: {}", info.manufacturer);
    println!("Product:      {}", info.product_name);
    println!("Serial:       {}", info.serial);
    println!("Path:         {}", info.device_path);

    let resp = transport.transfer(cmd::GET_FIRMWARE, &[], Target::Keyboard)?;
    println!("Firmware:     {}", parse_firmware(&resp)?);
    if model.is_wireless() {
        let resp = transport.transfer(cmd::GET_FIRMWARE, &[], Target::Dongle)?;
        println!("Dongle:       {}", parse_firmware(&resp)?);
    }
    Ok(())
}
