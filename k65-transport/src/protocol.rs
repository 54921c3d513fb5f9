//! Protocol constants and utilities for K65 Plus keyboard communication

use crate::error::TransportError;

/// Corsair USB vendor ID
pub const VENDOR_ID: u16 = 0x1B1C;

/// Known product IDs
pub mod product {
    /// K65 Plus, USB cable
    pub const K65_PLUS: u16 = 0x2B10;
    /// K65 Plus Wireless, 2.4GHz dongle
    pub const K65_PLUS_WIRELESS: u16 = 0x2B07;
}

/// HID interface numbers
pub mod interface {
    /// Vendor command/response interface
    pub const COMMAND: i32 = 1;
    /// Control dial input reports
    pub const DIAL: i32 = 2;
}

/// Output report size (report id slot + 64 data bytes)
pub const REPORT_SIZE: usize = 65;

/// Input report size
pub const INPUT_REPORT_SIZE: usize = 64;

/// Header bytes in front of the color data tag: u16 length + two reserved bytes
pub const COLOR_HEADER_SIZE: usize = 4;

/// Largest payload one color chunk may carry
pub const MAX_CHUNK_PAYLOAD: usize = 61;

/// Command selector bytes, written at report offset 1
pub mod selector {
    /// Dongle, or the keyboard itself on the wired model
    pub const DONGLE: u8 = 0x08;
    /// Keyboard behind a wireless dongle
    pub const KEYBOARD: u8 = 0x09;
}

/// Command opcodes
pub mod cmd {
    pub const SOFTWARE_MODE: &[u8] = &[0x01, 0x03, 0x00, 0x02];
    pub const HARDWARE_MODE: &[u8] = &[0x01, 0x03, 0x00, 0x01];
    /// Followed by u16 LE level (0-1000)
    pub const BRIGHTNESS: &[u8] = &[0x01, 0x02, 0x00];
    pub const GET_FIRMWARE: &[u8] = &[0x02, 0x13];
    pub const KEEP_ALIVE: &[u8] = &[0x12];
    /// Followed by u32 LE milliseconds
    pub const SLEEP_TIMER: &[u8] = &[0x01, 0x0E, 0x00];

    pub const ACTIVATE_LED_WIRED: &[u8] = &[0x0D, 0x00, 0x22];
    pub const ACTIVATE_LED_WIRELESS: &[u8] = &[0x0D, 0x01, 0x60, 0x6D];

    pub const WRITE_COLOR_WIRED: &[u8] = &[0x06, 0x00];
    pub const SUB_COLOR_WIRED: &[u8] = &[0x07, 0x00];
    pub const WRITE_COLOR_WIRELESS: &[u8] = &[0x06, 0x01];
    pub const SUB_COLOR_WIRELESS: &[u8] = &[0x07, 0x01];

    /// Get human-readable name for an opcode
    pub fn name(opcode: &[u8]) -> &'static str {
        match opcode {
            SOFTWARE_MODE => "SOFTWARE_MODE",
            HARDWARE_MODE => "HARDWARE_MODE",
            BRIGHTNESS => "BRIGHTNESS",
            GET_FIRMWARE => "GET_FIRMWARE",
            KEEP_ALIVE => "KEEP_ALIVE",
            SLEEP_TIMER => "SLEEP_TIMER",
            ACTIVATE_LED_WIRED | ACTIVATE_LED_WIRELESS => "ACTIVATE_LED",
            WRITE_COLOR_WIRED | WRITE_COLOR_WIRELESS => "WRITE_COLOR",
            SUB_COLOR_WIRED | SUB_COLOR_WIRELESS => "SUB_COLOR",
            _ => "UNKNOWN",
        }
    }
}

/// Color data type tags
pub mod data_type {
    /// Per-channel RGB triples, wired model
    pub const SET_COLOR_WIRED: &[u8] = &[0x12, 0x00];
    /// Single color fill, wireless model
    pub const SET_COLOR_WIRELESS: &[u8] = &[0x7E, 0x20, 0x01];
}

/// Timing constants
pub mod timing {
    /// Keep-alive ping interval
    pub const KEEP_ALIVE_MS: u64 = 20_000;
    /// Temperature refresh interval
    pub const TELEMETRY_MS: u64 = 1_000;
    /// Settle time after LED activation
    pub const LED_SETTLE_MS: u64 = 500;
    /// Response read timeout
    pub const TRANSFER_TIMEOUT_MS: i32 = 500;
    /// Pause between dial reads
    pub const DIAL_PACE_MS: u64 = 40;
    /// Dial read timeout, bounds how long a stop request waits
    pub const DIAL_READ_TIMEOUT_MS: i32 = 100;
}

/// Build a 65-byte output report
///
/// Layout: `[0]` report id, `[1]` selector, `[2..]` opcode then payload.
/// Anything past the report size is truncated.
pub fn encode_report(selector: u8, opcode: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; REPORT_SIZE];
    buf[1] = selector;
    let body = opcode.iter().chain(payload.iter());
    for (slot, byte) in buf[2..].iter_mut().zip(body) {
        *slot = *byte;
    }
    buf
}

/// Parse a firmware version reply as `major.minor.patch`
pub fn parse_firmware(resp: &[u8]) -> Result<String, TransportError> {
    if resp.len() < 7 {
        return Err(TransportError::ShortResponse {
            expected: 7,
            actual: resp.len(),
        });
    }
    let patch = u16::from_le_bytes([resp[5], resp[6]]);
    Ok(format!("{}.{}.{}", resp[3], resp[4], patch))
}

/// Brightness command payload
pub fn brightness_payload(level: u16) -> [u8; 2] {
    level.to_le_bytes()
}

/// Sleep timer payload, minutes to u32 LE milliseconds
pub fn sleep_payload(minutes: u32) -> [u8; 4] {
    minutes.saturating_mul(60_000).to_le_bytes()
}
