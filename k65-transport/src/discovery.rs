//! Device discovery for K65 Plus keyboards

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::hid::HidTransport;
use crate::protocol::{interface, product, VENDOR_ID};
use crate::types::{DiscoveredDevice, TransportDeviceInfo, TransportType};

/// HID device discovery for wired and dongle connections
pub struct HidDiscovery {
    vendor_id: u16,
    /// Product IDs to look for; empty matches any product of the vendor
    product_ids: Vec<u16>,
    command_interface: i32,
    dial_interface: i32,
}

impl Default for HidDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl HidDiscovery {
    /// Discovery for the known K65 Plus product IDs
    pub fn new() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_ids: vec![product::K65_PLUS, product::K65_PLUS_WIRELESS],
            command_interface: interface::COMMAND,
            dial_interface: interface::DIAL,
        }
    }

    pub fn with_vendor(mut self, vendor_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self
    }

    pub fn with_products(mut self, product_ids: Vec<u16>) -> Self {
        self.product_ids = product_ids;
        self
    }

    pub fn with_interfaces(mut self, command: i32, dial: i32) -> Self {
        self.command_interface = command;
        self.dial_interface = dial;
        self
    }

    fn is_known_device(&self, vid: u16, pid: u16) -> bool {
        vid == self.vendor_id && (self.product_ids.is_empty() || self.product_ids.contains(&pid))
    }

    /// List command interfaces of matching devices
    pub fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let api = HidApi::new()?;
        let devices = api
            .device_list()
            .filter(|d| self.is_known_device(d.vendor_id(), d.product_id()))
            .filter(|d| d.interface_number() == self.command_interface)
            .map(|d| DiscoveredDevice {
                vid: d.vendor_id(),
                pid: d.product_id(),
                interface_number: d.interface_number(),
                path: d.path().to_string_lossy().into_owned(),
                product_name: d.product_string().map(str::to_owned),
                serial: d.serial_number().map(str::to_owned),
            })
            .collect::<Vec<_>>();
        debug!("Found {} matching HID interfaces", devices.len());
        Ok(devices)
    }

    /// Open the command interface and read the device identity strings
    ///
    /// Missing identity strings fail the open, the device is unusable without
    /// a serial to key its profile on.
    pub fn open_device(
        &self,
        device: &DiscoveredDevice,
        transport_type: TransportType,
    ) -> Result<HidTransport, TransportError> {
        let api = HidApi::new()?;
        let path = std::ffi::CString::new(device.path.clone())
            .map_err(|e| TransportError::Internal(e.to_string()))?;
        let hid = api.open_path(&path)?;

        let manufacturer = identity(hid.get_manufacturer_string()?, "manufacturer")?;
        let product_name = identity(hid.get_product_string()?, "product")?;
        let serial = identity(hid.get_serial_number_string()?, "serial")?;

        info!(
            "Opened {} ({}) serial {} at {}",
            product_name, manufacturer, serial, device.path
        );

        let info = TransportDeviceInfo {
            vid: device.vid,
            pid: device.pid,
            transport_type,
            device_path: device.path.clone(),
            manufacturer,
            product_name,
            serial,
        };
        Ok(HidTransport::new(hid, info))
    }

    /// Open the dial input interface of an already opened device
    pub fn open_dial(&self, info: &TransportDeviceInfo) -> Result<HidDevice, TransportError> {
        let api = HidApi::new()?;
        let found = api.device_list().find(|d| {
            d.vendor_id() == info.vid
                && d.product_id() == info.pid
                && d.interface_number() == self.dial_interface
                && d.serial_number().map_or(true, |s| s.is_empty() || s == info.serial)
        });
        match found {
            Some(d) => {
                debug!("Opening dial interface {:?}", d.path());
                Ok(d.open_device(&api)?)
            }
            None => Err(TransportError::DeviceNotFound(format!(
                "dial interface {} of {:04x}:{:04x}",
                self.dial_interface, info.vid, info.pid
            ))),
        }
    }
}

fn identity(value: Option<String>, what: &str) -> Result<String, TransportError> {
    value
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TransportError::DeviceNotFound(format!("device reports no {}", what)))
}
