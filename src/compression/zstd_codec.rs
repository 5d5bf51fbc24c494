//! zstd codec (mode 0)

use crate::error::{IidbError, Result};

use super::Codec;

/// zstd single-frame codec
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub const DEFAULT_LEVEL: i32 = 7;

    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        ::zstd::bulk::compress(raw, self.level).map_err(|e| IidbError::Codec {
            codec: "zstd",
            message: e.to_string(),
        })
    }

    fn check_decoded_len(&self, blob: &[u8], expected: usize) -> Result<()> {
        let declared = ::zstd::zstd_safe::get_frame_content_size(blob)
            .map_err(|_| {
                IidbError::MalformedRecord("zstd payload: not a zstd frame".to_string())
            })?
            .ok_or_else(|| {
                IidbError::MalformedRecord(
                    "zstd payload: frame does not declare its content size".to_string(),
                )
            })?;

        if declared != expected as u64 {
            return Err(IidbError::MalformedRecord(format!(
                "zstd payload: frame holds {} bytes, header needs {}",
                declared, expected
            )));
        }
        Ok(())
    }

    fn decompress_into(&self, blob: &[u8], out: &mut [u8]) -> Result<usize> {
        // A frame that decodes to more than `out` fails here instead of growing the buffer.
        ::zstd::bulk::decompress_to_buffer(blob, out)
            .map_err(|e| IidbError::MalformedRecord(format!("zstd payload: {}", e)))
    }
}
