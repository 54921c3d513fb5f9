//! Control dial input reports
//!
//! The dial lives on its own HID interface and only sends unsolicited input
//! reports. Byte 4 carries the rotation, byte 19 flags a press.

use hidapi::HidDevice;

use crate::error::TransportError;

/// Offset of the rotation value
pub const ROTATION_OFFSET: usize = 4;
/// Offset of the press marker
pub const PRESS_OFFSET: usize = 19;
/// Press marker value
pub const PRESS_MARKER: u8 = 0x02;

/// Decoded dial input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialEvent {
    /// Counter-clockwise step
    RotateLeft,
    /// Clockwise step
    RotateRight,
    Press,
}

/// Decode one input report, `None` for reports that carry no dial action
pub fn parse_dial_report(data: &[u8]) -> Option<DialEvent> {
    let value = *data.get(ROTATION_OFFSET)?;
    match value {
        0x01 => Some(DialEvent::RotateRight),
        0xFF => Some(DialEvent::RotateLeft),
        0x00 if data.get(PRESS_OFFSET) == Some(&PRESS_MARKER) => Some(DialEvent::Press),
        _ => None,
    }
}

/// Source of input reports
///
/// `read_timeout` returns `Ok(0)` when nothing arrived within the timeout.
pub trait InputReader: Send {
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError>;
}

impl InputReader for HidDevice {
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        Ok(HidDevice::read_timeout(self, buf, timeout_ms)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(value: u8, marker: u8) -> [u8; 64] {
        let mut buf = [0u8; 64];
        buf[ROTATION_OFFSET] = value;
        buf[PRESS_OFFSET] = marker;
        buf
    }

    #[test]
    fn test_parse_rotation() {
        assert_eq!(parse_dial_report(&report(1, 0)), Some(DialEvent::RotateRight));
        assert_eq!(parse_dial_report(&report(0xFF, 0)), Some(DialEvent::RotateLeft));
    }

    #[test]
    fn test_parse_press() {
        assert_eq!(parse_dial_report(&report(0, 2)), Some(DialEvent::Press));
        // release report
        assert_eq!(parse_dial_report(&report(0, 0)), None);
    }

    #[test]
    fn test_parse_short_or_unknown() {
        assert_eq!(parse_dial_report(&[0, 0, 0]), None);
        assert_eq!(parse_dial_report(&report(0x42, 0)), None);
        // press marker missing from a short report
        assert_eq!(parse_dial_report(&[0, 0, 0, 0, 0]), None);
    }
}
