//! Transport layer for K65 Plus keyboard communication
//!
//! Provides the fixed-size report protocol, the color frame codec, and a
//! blocking request/response [`Transport`] over HID for both the wired
//! keyboard and the wireless dongle.

pub mod codec;
pub mod dial;
pub mod error;
pub mod protocol;
pub mod types;

mod discovery;
mod hid;

pub use codec::{ColorChunk, ColorFraming, LengthMode};
pub use dial::{parse_dial_report, DialEvent, InputReader};
pub use discovery::HidDiscovery;
pub use error::TransportError;
pub use hid::HidTransport;
pub use protocol::VENDOR_ID;
pub use types::{DiscoveredDevice, SelectorMap, Target, TransportDeviceInfo, TransportType};

/// The core transport trait
///
/// One call is one complete exchange: the report is written and the reply is
/// read before any other exchange may start. Failures are returned to the
/// caller, nothing is retried here.
pub trait Transport: Send + Sync {
    /// Send `opcode` + `payload` to `target` and return the raw reply
    fn transfer(
        &self,
        opcode: &[u8],
        payload: &[u8],
        target: Target,
    ) -> Result<Vec<u8>, TransportError>;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;
}
