//! Compression Module
//!
//! Pluggable payload codecs selected by the mode tag stored in each record
//! header.
//!
//! ## Modes
//! - 0: zstd (general purpose, default). The frame carries its own length.
//! - 1: LZ4 block (speed over ratio). The block does NOT carry its length,
//!   so decompression needs `height * width * channels` from the header.
//!
//! The expected length comes from an untrusted header, so every codec
//! checks it against the payload before a buffer of that size exists.
//!
//! Codecs are plain values owned by whoever constructed them. They keep no
//! state between calls and are safe to share across threads.

mod lz4_codec;
mod zstd_codec;

use std::fmt;

use crate::error::{IidbError, Result};

pub use lz4_codec::Lz4Codec;
pub use zstd_codec::ZstdCodec;

/// Compression mode tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum CompressionMode {
    #[default]
    Zstd = 0,
    Lz4 = 1,
}

impl CompressionMode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for CompressionMode {
    type Error = IidbError;

    fn try_from(tag: u16) -> Result<Self> {
        match tag {
            0 => Ok(CompressionMode::Zstd),
            1 => Ok(CompressionMode::Lz4),
            other => Err(IidbError::UnsupportedCompressionMode(other)),
        }
    }
}

impl From<CompressionMode> for u16 {
    fn from(mode: CompressionMode) -> u16 {
        mode.as_u16()
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMode::Zstd => f.write_str("zstd"),
            CompressionMode::Lz4 => f.write_str("lz4"),
        }
    }
}

/// A byte compressor/decompressor pair
pub trait Codec: Send + Sync {
    /// Short name used in errors and logs
    fn name(&self) -> &'static str;

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>>;

    /// Decompress into `out`, returning the number of bytes written.
    /// `out.len()` is the expected decoded size.
    fn decompress_into(&self, blob: &[u8], out: &mut [u8]) -> Result<usize>;

    /// Reject `blob` if it cannot decode to `expected` bytes, without
    /// decoding it
    fn check_decoded_len(&self, blob: &[u8], expected: usize) -> Result<()>;

    /// Decompress into a fresh buffer of at most `size_hint` bytes, once the
    /// payload has passed `check_decoded_len`
    fn decompress(&self, blob: &[u8], size_hint: usize) -> Result<Vec<u8>> {
        self.check_decoded_len(blob, size_hint)?;
        let mut out = vec![0u8; size_hint];
        let written = self.decompress_into(blob, &mut out)?;
        out.truncate(written);
        Ok(out)
    }
}

/// One codec instance per mode, dispatched by the header tag
#[derive(Debug, Clone)]
pub struct CodecSet {
    zstd: ZstdCodec,
    lz4: Lz4Codec,
}

impl CodecSet {
    pub fn new(zstd_level: i32, lz4_level: i32) -> Self {
        Self {
            zstd: ZstdCodec::new(zstd_level),
            lz4: Lz4Codec::new(lz4_level),
        }
    }

    /// Codec registered for `mode`
    pub fn codec(&self, mode: CompressionMode) -> &dyn Codec {
        match mode {
            CompressionMode::Zstd => &self.zstd,
            CompressionMode::Lz4 => &self.lz4,
        }
    }

    /// Resolve a raw header tag, failing on unknown modes
    pub fn resolve(&self, tag: u16) -> Result<&dyn Codec> {
        CompressionMode::try_from(tag).map(|mode| self.codec(mode))
    }

    pub fn compress(&self, tag: u16, raw: &[u8]) -> Result<Vec<u8>> {
        self.resolve(tag)?.compress(raw)
    }

    pub fn decompress(&self, tag: u16, blob: &[u8], size_hint: usize) -> Result<Vec<u8>> {
        self.resolve(tag)?.decompress(blob, size_hint)
    }

    pub fn check_decoded_len(&self, tag: u16, blob: &[u8], expected: usize) -> Result<()> {
        self.resolve(tag)?.check_decoded_len(blob, expected)
    }

    pub fn decompress_into(&self, tag: u16, blob: &[u8], out: &mut [u8]) -> Result<usize> {
        self.resolve(tag)?.decompress_into(blob, out)
    }
}

impl Default for CodecSet {
    fn default() -> Self {
        Self::new(ZstdCodec::DEFAULT_LEVEL, Lz4Codec::DEFAULT_LEVEL)
    }
}

/// Version number of the linked zstd library (e.g. 10505 for 1.5.5)
pub fn zstd_version() -> u32 {
    ::zstd::zstd_safe::version_number()
}
