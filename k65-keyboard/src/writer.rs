//! Color output through the frame codec

use std::sync::Arc;

use k65_transport::{Target, Transport};
use tracing::trace;

use crate::color::Color;
use crate::error::KeyboardError;
use crate::model::{KeyboardModel, OffloadTrigger};

/// Frames color data for a model and pushes it to the keyboard
pub struct ColorWriter {
    transport: Arc<dyn Transport>,
    model: KeyboardModel,
}

impl ColorWriter {
    pub fn new(transport: Arc<dyn Transport>, model: KeyboardModel) -> Self {
        Self { transport, model }
    }

    pub fn model(&self) -> KeyboardModel {
        self.model
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Write channel triples or a per-key frame with the model's color tag
    pub fn write_channels(&self, payload: &[u8]) -> Result<(), KeyboardError> {
        let mut payload = payload.to_vec();
        if let Some(span) = self.model.reserved_span() {
            if let Some(slot) = payload.get_mut(span) {
                slot.fill(0);
            }
        }
        self.write_tagged(self.model.color_tag(), &payload)
    }

    /// All channels off
    pub fn write_reset(&self) -> Result<(), KeyboardError> {
        self.write_channels(&vec![0u8; self.model.led_channels() * 3])
    }

    /// Send a firmware effect trigger
    pub fn write_trigger(
        &self,
        trigger: &OffloadTrigger,
        color: Option<&Color>,
    ) -> Result<(), KeyboardError> {
        self.write_tagged(trigger.tag, &trigger.payload(color))
    }

    /// Frame, chunk and send; stops at the first failed chunk
    pub fn write_tagged(&self, tag: &[u8], payload: &[u8]) -> Result<(), KeyboardError> {
        let chunks = self.model.framing().encode(tag, payload);
        trace!("Writing {} color bytes in {} chunks", payload.len(), chunks.len());
        for chunk in &chunks {
            self.transport
                .transfer(chunk.opcode, &chunk.data, Target::Keyboard)?;
        }
        Ok(())
    }
}
