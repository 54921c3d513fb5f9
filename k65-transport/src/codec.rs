//! Color frame codec
//!
//! A color write is framed as `[u16 LE length][0, 0][tag][payload]` and then
//! split into slices of at most [`MAX_CHUNK_PAYLOAD`] bytes. The first slice
//! travels with the write-color opcode, every following slice with the
//! continuation opcode. Firmware uses the opcode to tell a new transfer from
//! a continuing one.

use crate::protocol::{cmd, COLOR_HEADER_SIZE, MAX_CHUNK_PAYLOAD};

/// What the u16 length field counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthMode {
    /// Payload bytes only
    PayloadOnly,
    /// Payload plus the data type tag
    PayloadAndTag,
}

/// Model-specific framing parameters for color writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorFraming {
    /// Opcode for the first chunk
    pub write_opcode: &'static [u8],
    /// Opcode for every chunk after the first
    pub continue_opcode: &'static [u8],
    pub length_mode: LengthMode,
}

impl ColorFraming {
    pub const WIRED: Self = Self {
        write_opcode: cmd::WRITE_COLOR_WIRED,
        continue_opcode: cmd::SUB_COLOR_WIRED,
        length_mode: LengthMode::PayloadAndTag,
    };

    pub const WIRELESS: Self = Self {
        write_opcode: cmd::WRITE_COLOR_WIRELESS,
        continue_opcode: cmd::SUB_COLOR_WIRELESS,
        length_mode: LengthMode::PayloadOnly,
    };

    /// Frame and chunk a payload with this framing
    pub fn encode(&self, tag: &[u8], payload: &[u8]) -> Vec<ColorChunk> {
        chunk(self, &frame_color(tag, payload, self.length_mode), MAX_CHUNK_PAYLOAD)
    }
}

/// One bounded piece of a framed color write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorChunk {
    pub opcode: &'static [u8],
    pub data: Vec<u8>,
}

impl ColorChunk {
    /// True for the chunk that opens a transfer
    pub fn is_initial(&self, framing: &ColorFraming) -> bool {
        self.opcode == framing.write_opcode
    }
}

/// Prefix a payload with the length header and data type tag
pub fn frame_color(tag: &[u8], payload: &[u8], mode: LengthMode) -> Vec<u8> {
    let len = match mode {
        LengthMode::PayloadOnly => payload.len(),
        LengthMode::PayloadAndTag => payload.len() + tag.len(),
    };
    let mut buf = Vec::with_capacity(COLOR_HEADER_SIZE + tag.len() + payload.len());
    buf.extend_from_slice(&(len as u16).to_le_bytes());
    buf.extend_from_slice(&[0, 0]);
    buf.extend_from_slice(tag);
    buf.extend_from_slice(payload);
    buf
}

/// Split a framed buffer into chunks of at most `max` bytes
///
/// Always yields at least one chunk, so an empty frame still opens a transfer.
pub fn chunk(framing: &ColorFraming, framed: &[u8], max: usize) -> Vec<ColorChunk> {
    let max = max.max(1);
    if framed.is_empty() {
        return vec![ColorChunk {
            opcode: framing.write_opcode,
            data: Vec::new(),
        }];
    }
    framed
        .chunks(max)
        .enumerate()
        .map(|(i, data)| ColorChunk {
            opcode: if i == 0 {
                framing.write_opcode
            } else {
                framing.continue_opcode
            },
            data: data.to_vec(),
        })
        .collect()
}

/// Reassemble chunks and strip the header and tag, returning the payload
pub fn unframe(chunks: &[ColorChunk], tag_len: usize) -> Option<Vec<u8>> {
    let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data.iter().copied()).collect();
    let start = COLOR_HEADER_SIZE + tag_len;
    if joined.len() < start {
        return None;
    }
    Some(joined[start..].to_vec())
}
