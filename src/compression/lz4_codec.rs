//! LZ4 block codec (mode 1)
//!
//! Raw blocks without a size prefix, so the decoded size must come from
//! the record header.

use lz4::block::{self, CompressionMode as Lz4Mode};

use crate::error::{IidbError, Result};

use super::Codec;

/// Output bytes one input byte can expand to in an LZ4 block (a run of
/// 0xFF match-length bytes)
const MAX_EXPANSION: usize = 255;

/// Slack for the shortest blocks, whose token and minimum match dominate
const EXPANSION_SLACK: usize = 64;

/// LZ4 block codec
#[derive(Debug, Clone, Copy)]
pub struct Lz4Codec {
    /// 0 = fast compressor, >0 = HC compressor at this level
    level: i32,
}

impl Lz4Codec {
    pub const DEFAULT_LEVEL: i32 = 7;

    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    fn mode(&self) -> Lz4Mode {
        if self.level > 0 {
            Lz4Mode::HIGHCOMPRESSION(self.level)
        } else {
            Lz4Mode::DEFAULT
        }
    }
}

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        block::compress(raw, Some(self.mode()), false).map_err(|e| IidbError::Codec {
            codec: "lz4",
            message: e.to_string(),
        })
    }

    fn check_decoded_len(&self, blob: &[u8], expected: usize) -> Result<()> {
        let limit = blob
            .len()
            .saturating_mul(MAX_EXPANSION)
            .saturating_add(EXPANSION_SLACK);
        if expected > limit {
            return Err(IidbError::MalformedRecord(format!(
                "lz4 payload: {} bytes cannot expand to {}",
                blob.len(),
                expected
            )));
        }
        Ok(())
    }

    fn decompress_into(&self, blob: &[u8], out: &mut [u8]) -> Result<usize> {
        let expected = i32::try_from(out.len()).map_err(|_| {
            IidbError::MalformedRecord(format!(
                "lz4 payload: decoded size {} exceeds block limit",
                out.len()
            ))
        })?;

        block::decompress_to_buffer(blob, Some(expected), out)
            .map_err(|e| IidbError::MalformedRecord(format!("lz4 payload: {}", e)))
    }
}
