//! Common types for transport layer

use serde::Serialize;

use crate::protocol::selector;

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    /// Direct USB HID connection
    HidWired,
    /// 2.4GHz wireless via USB dongle
    HidDongle,
}

impl TransportType {
    /// Check if this transport is wireless
    pub fn is_wireless(&self) -> bool {
        matches!(self, Self::HidDongle)
    }
}

/// Which sub-device a command is addressed to
///
/// The protocol multiplexes sub-devices through the selector byte of a
/// report rather than through separate handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Keyboard,
    Dongle,
}

/// Maps a [`Target`] to its selector byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorMap {
    pub keyboard: u8,
    pub dongle: u8,
}

impl SelectorMap {
    /// Wired keyboards answer on the dongle selector
    pub const WIRED: Self = Self {
        keyboard: selector::DONGLE,
        dongle: selector::DONGLE,
    };

    pub const WIRELESS: Self = Self {
        keyboard: selector::KEYBOARD,
        dongle: selector::DONGLE,
    };

    pub fn for_transport(transport_type: TransportType) -> Self {
        match transport_type {
            TransportType::HidWired => Self::WIRED,
            TransportType::HidDongle => Self::WIRELESS,
        }
    }

    pub fn select(&self, target: Target) -> u8 {
        match target {
            Target::Keyboard => self.keyboard,
            Target::Dongle => self.dongle,
        }
    }
}

/// Device identification information
#[derive(Debug, Clone, Serialize)]
pub struct TransportDeviceInfo {
    /// USB Vendor ID
    pub vid: u16,
    /// USB Product ID
    pub pid: u16,
    /// Transport type
    pub transport_type: TransportType,
    /// Device path
    pub device_path: String,
    /// Manufacturer string
    pub manufacturer: String,
    /// Product name
    pub product_name: String,
    /// Serial number
    pub serial: String,
}

/// Device discovered during enumeration, not yet opened
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    pub vid: u16,
    pub pid: u16,
    pub interface_number: i32,
    pub path: String,
    pub product_name: Option<String>,
    pub serial: Option<String>,
}
