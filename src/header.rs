//! Record header codec
//!
//! Every stored value starts with a fixed 8-byte header:
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬──────────────────────┐
//! │ Mode (2) │Height (2)│ Width (2)│ Chans (2)│ Compressed payload   │
//! └──────────┴──────────┴──────────┴──────────┴──────────────────────┘
//! ```
//!
//! All four fields are little-endian u16. The header is the only metadata
//! persisted per record and is never compressed.

use bytes::{Buf, BufMut};

use crate::error::{IidbError, Result};

/// Header size in bytes
pub const HEADER_SIZE: usize = 8;

/// Decoded record header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHeader {
    /// Compression mode tag of the payload
    pub mode: u16,
    pub height: u16,
    pub width: u16,
    pub channels: u16,
}

impl RecordHeader {
    pub fn new(mode: u16, height: u16, width: u16, channels: u16) -> Self {
        Self {
            mode,
            height,
            width,
            channels,
        }
    }

    /// Pack into the fixed 8-byte little-endian form
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        self.encode_into(&mut &mut out[..]);
        out
    }

    /// Append the header to any byte sink
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16_le(self.mode);
        buf.put_u16_le(self.height);
        buf.put_u16_le(self.width);
        buf.put_u16_le(self.channels);
    }

    /// Unpack from the first 8 bytes of `bytes`; trailing bytes are ignored
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(IidbError::MalformedRecord(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut buf = &bytes[..HEADER_SIZE];
        Ok(Self {
            mode: buf.get_u16_le(),
            height: buf.get_u16_le(),
            width: buf.get_u16_le(),
            channels: buf.get_u16_le(),
        })
    }

    /// `(height, width)`
    pub fn dimensions(&self) -> (u16, u16) {
        (self.height, self.width)
    }

    /// Byte length of the uncompressed image the header describes
    pub fn decoded_len(&self) -> usize {
        usize::from(self.height) * usize::from(self.width) * usize::from(self.channels)
    }
}

/// Pack a header from its four fields
pub fn encode(mode: u16, height: u16, width: u16, channels: u16) -> [u8; HEADER_SIZE] {
    RecordHeader::new(mode, height, width, channels).encode()
}

/// Unpack `(mode, height, width, channels)`
pub fn decode(bytes: &[u8]) -> Result<(u16, u16, u16, u16)> {
    let header = RecordHeader::decode(bytes)?;
    Ok((header.mode, header.height, header.width, header.channels))
}
