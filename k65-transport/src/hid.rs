//! HID transport for wired and dongle connections

use hidapi::HidDevice;
use parking_lot::Mutex;
use tracing::{error, trace};

use crate::error::TransportError;
use crate::protocol::{self, cmd, timing, INPUT_REPORT_SIZE};
use crate::types::{SelectorMap, Target, TransportDeviceInfo};
use crate::Transport;

/// Command/response session over the vendor HID interface
///
/// The device lock is held across the write and the matching read, so
/// exchanges issued from different threads never interleave on the wire.
pub struct HidTransport {
    device: Mutex<HidDevice>,
    info: TransportDeviceInfo,
    selectors: SelectorMap,
    read_timeout_ms: i32,
}

impl HidTransport {
    pub fn new(device: HidDevice, info: TransportDeviceInfo) -> Self {
        let selectors = SelectorMap::for_transport(info.transport_type);
        Self {
            device: Mutex::new(device),
            info,
            selectors,
            read_timeout_ms: timing::TRANSFER_TIMEOUT_MS,
        }
    }

    /// Override the response read timeout (default 500ms)
    pub fn set_read_timeout(&mut self, ms: i32) {
        self.read_timeout_ms = ms;
    }
}

impl Transport for HidTransport {
    fn transfer(
        &self,
        opcode: &[u8],
        payload: &[u8],
        target: Target,
    ) -> Result<Vec<u8>, TransportError> {
        let buf = protocol::encode_report(self.selectors.select(target), opcode, payload);
        let mut resp = vec![0u8; INPUT_REPORT_SIZE];

        let device = self.device.lock();
        trace!("{} -> {:?}: {:02X?}", cmd::name(opcode), target, &buf[..8]);

        if let Err(e) = device.write(&buf) {
            error!(serial = %self.info.serial, error = %e, "Unable to write to device");
            return Err(e.into());
        }
        match device.read_timeout(&mut resp, self.read_timeout_ms) {
            Ok(0) => {
                error!(serial = %self.info.serial, "No response from device");
                Err(TransportError::Timeout)
            }
            Ok(n) => {
                resp.truncate(n);
                Ok(resp)
            }
            Err(e) => {
                error!(serial = %self.info.serial, error = %e, "Unable to read from device");
                Err(e.into())
            }
        }
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }
}
