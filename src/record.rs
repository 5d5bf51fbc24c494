//! Record codec
//!
//! Turns an image into a storable value and back:
//! `header (8 bytes) || compressed row-major samples`.
//!
//! ## Responsibilities
//! - Derive the header shape from the image
//! - Dispatch payload (de)compression by header mode
//! - Verify the decoded length against the header before reshaping
//! - Read dimensions from the header alone, without touching the payload

use bytes::BufMut;

use crate::compression::{CodecSet, CompressionMode};
use crate::error::{IidbError, Result};
use crate::header::{RecordHeader, HEADER_SIZE};
use crate::image::Image;

/// Encoder/decoder for stored records
#[derive(Debug, Clone, Default)]
pub struct RecordCodec {
    codecs: CodecSet,
}

impl RecordCodec {
    pub fn new(codecs: CodecSet) -> Self {
        Self { codecs }
    }

    pub fn codecs(&self) -> &CodecSet {
        &self.codecs
    }

    /// Encode `image` with `mode`
    ///
    /// Fails with `InvalidImage` if any dimension exceeds 65535.
    pub fn encode(&self, image: &Image, mode: CompressionMode) -> Result<Vec<u8>> {
        let header = RecordHeader::new(
            mode.as_u16(),
            header_dim("height", image.height())?,
            header_dim("width", image.width())?,
            header_dim("channels", image.channels())?,
        );

        let payload = self.codecs.codec(mode).compress(image.as_bytes())?;

        let mut record: Vec<u8> = Vec::with_capacity(HEADER_SIZE + payload.len());
        header.encode_into(&mut record);
        record.put_slice(&payload);

        tracing::trace!(
            mode = %mode,
            raw = image.as_bytes().len(),
            stored = record.len(),
            "encoded record"
        );

        Ok(record)
    }

    /// Decode a full record into an owned image
    ///
    /// 2-D when the header says one channel, 3-D otherwise.
    pub fn decode(&self, bytes: &[u8]) -> Result<Image> {
        let header = checked_header(bytes)?;
        let expected = header.decoded_len();

        let raw = self
            .codecs
            .decompress(header.mode, &bytes[HEADER_SIZE..], expected)?;

        if raw.len() != expected {
            return Err(IidbError::MalformedRecord(format!(
                "decoded {} bytes, header {}x{}x{} needs {}",
                raw.len(),
                header.height,
                header.width,
                header.channels,
                expected
            )));
        }

        let (height, width) = (usize::from(header.height), usize::from(header.width));
        if header.channels == 1 {
            Image::new_2d(height, width, raw)
        } else {
            Image::new_3d(height, width, usize::from(header.channels), raw)
        }
    }

    /// Header of `bytes`, once its payload is known to fit the declared shape
    ///
    /// Cheap: no decompression. Use before sizing a buffer from the header.
    pub fn check(&self, bytes: &[u8]) -> Result<RecordHeader> {
        let header = checked_header(bytes)?;
        self.codecs
            .check_decoded_len(header.mode, &bytes[HEADER_SIZE..], header.decoded_len())?;
        Ok(header)
    }

    /// Decode the payload straight into `out`, which must be exactly the
    /// header's decoded length
    pub fn decode_into(&self, bytes: &[u8], out: &mut [u8]) -> Result<RecordHeader> {
        let header = checked_header(bytes)?;
        let expected = header.decoded_len();

        if out.len() != expected {
            return Err(IidbError::ShapeMismatch(format!(
                "output slot holds {} bytes, record needs {}",
                out.len(),
                expected
            )));
        }

        let written = self
            .codecs
            .decompress_into(header.mode, &bytes[HEADER_SIZE..], out)?;

        if written != expected {
            return Err(IidbError::MalformedRecord(format!(
                "decoded {} bytes, header needs {}",
                written, expected
            )));
        }

        Ok(header)
    }

    /// Decode many records on up to `threads` scoped workers, preserving
    /// input order. The first failure in input order is returned.
    pub fn decode_parallel<B>(&self, records: &[B], threads: usize) -> Result<Vec<Image>>
    where
        B: AsRef<[u8]> + Sync,
    {
        let threads = threads.max(1).min(records.len());
        if threads <= 1 {
            return records.iter().map(|r| self.decode(r.as_ref())).collect();
        }

        let chunk_size = records.len().div_ceil(threads);

        let chunks: Vec<Result<Vec<Image>>> = crossbeam::thread::scope(|s| {
            let handles: Vec<_> = records
                .chunks(chunk_size)
                .map(|chunk| {
                    s.spawn(move |_| {
                        chunk
                            .iter()
                            .map(|r| self.decode(r.as_ref()))
                            .collect::<Result<Vec<_>>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
        .unwrap_or_else(|e| std::panic::resume_unwind(e));

        let mut images = Vec::with_capacity(records.len());
        for chunk in chunks {
            images.extend(chunk?);
        }
        Ok(images)
    }

    /// Decode equally-shaped records into consecutive slots of `out`
    ///
    /// `out.len()` must be `records.len()` times the per-record size.
    pub fn decode_stacked<B>(&self, records: &[B], out: &mut [u8], threads: usize) -> Result<()>
    where
        B: AsRef<[u8]> + Sync,
    {
        if records.is_empty() {
            return Ok(());
        }
        if out.len() % records.len() != 0 {
            return Err(IidbError::ShapeMismatch(format!(
                "{} output bytes do not split into {} images",
                out.len(),
                records.len()
            )));
        }

        let image_len = out.len() / records.len();
        if image_len == 0 {
            for r in records {
                self.decode_into(r.as_ref(), &mut [])?;
            }
            return Ok(());
        }

        let threads = threads.max(1).min(records.len());
        let per_thread = records.len().div_ceil(threads);

        let results: Vec<Result<()>> = crossbeam::thread::scope(|s| {
            let handles: Vec<_> = records
                .chunks(per_thread)
                .zip(out.chunks_mut(per_thread * image_len))
                .map(|(chunk, slots)| {
                    s.spawn(move |_| {
                        for (r, slot) in chunk.iter().zip(slots.chunks_mut(image_len)) {
                            self.decode_into(r.as_ref(), slot)?;
                        }
                        Ok::<(), IidbError>(())
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
        .unwrap_or_else(|e| std::panic::resume_unwind(e));

        results.into_iter().collect()
    }
}

/// Header-only read: `(height, width)` without decompressing the payload
pub fn decode_dimensions(bytes: &[u8]) -> Result<(u16, u16)> {
    RecordHeader::decode(bytes).map(|h| h.dimensions())
}

/// Header of a record whose shape is usable for reconstruction
fn checked_header(bytes: &[u8]) -> Result<RecordHeader> {
    let header = RecordHeader::decode(bytes)?;
    if header.channels == 0 {
        tracing::warn!(?header, "record header declares zero channels");
        return Err(IidbError::MalformedRecord(
            "header declares zero channels".to_string(),
        ));
    }
    Ok(header)
}

fn header_dim(name: &str, value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| {
        IidbError::InvalidImage(format!("{} {} does not fit the 16-bit header", name, value))
    })
}
