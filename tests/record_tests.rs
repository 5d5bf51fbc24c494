//! Tests for RecordCodec and Image
//!
//! These tests verify:
//! - Pixel-exact round trips for both modes, 2-D and 3-D
//! - Header derivation from the image shape
//! - Header-only dimension reads ignore corrupt payloads
//! - Length mismatches and bad headers are malformed records
//! - Parallel batch decode keeps input order

mod common;

use iidb::compression::{CodecSet, CompressionMode};
use iidb::header::{self, RecordHeader, HEADER_SIZE};
use iidb::record::{decode_dimensions, RecordCodec};
use iidb::{IidbError, Image};

use common::{noise_3d, ramp_2d, ramp_3d};

const MODES: [CompressionMode; 2] = [CompressionMode::Zstd, CompressionMode::Lz4];

// =============================================================================
// Image Tests
// =============================================================================

#[test]
fn test_image_shape_2d() {
    let image = ramp_2d(5, 4, 0);

    assert_eq!(image.shape(), vec![5, 4]);
    assert_eq!(image.ndim(), 2);
    assert_eq!(image.channels(), 1);
    assert_eq!(image.pixel(1, 2, 0), Some(6));
    assert_eq!(image.pixel(5, 0, 0), None);
}

#[test]
fn test_image_shape_3d() {
    let image = ramp_3d(2, 3, 3);

    assert_eq!(image.shape(), vec![2, 3, 3]);
    assert_eq!(image.ndim(), 3);
    assert_eq!(image.pixel(1, 1, 2), Some(14));
    assert_eq!(image.pixel(0, 0, 3), None);
}

#[test]
fn test_image_rejects_wrong_length() {
    assert!(matches!(
        Image::new_2d(5, 5, vec![0; 24]),
        Err(IidbError::InvalidImage(_))
    ));
    assert!(matches!(
        Image::new_3d(5, 5, 3, vec![0; 25]),
        Err(IidbError::InvalidImage(_))
    ));
    assert!(matches!(
        Image::new_3d(5, 5, 0, vec![]),
        Err(IidbError::InvalidImage(_))
    ));
    assert!(matches!(
        Image::from_shape(&[2, 2, 2, 2], vec![0; 16]),
        Err(IidbError::InvalidImage(_))
    ));
}

// =============================================================================
// Encode Tests
// =============================================================================

#[test]
fn test_encode_writes_header_first() {
    let codec = RecordCodec::default();
    let image = ramp_3d(5, 6, 3);

    for mode in MODES {
        let record = codec.encode(&image, mode).unwrap();
        assert_eq!(
            header::decode(&record).unwrap(),
            (mode.as_u16(), 5, 6, 3)
        );
        assert!(record.len() > HEADER_SIZE);
    }
}

#[test]
fn test_encode_2d_has_one_channel() {
    let codec = RecordCodec::default();
    let record = codec.encode(&ramp_2d(3, 7, 0), CompressionMode::Zstd).unwrap();

    let header = RecordHeader::decode(&record).unwrap();
    assert_eq!(header.channels, 1);
}

#[test]
fn test_encode_rejects_oversized_dimension() {
    let codec = RecordCodec::default();
    let image = Image::new_2d(1, 70_000, vec![0; 70_000]).unwrap();

    let result = codec.encode(&image, CompressionMode::Zstd);
    assert!(matches!(result, Err(IidbError::InvalidImage(_))));
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_5x5_both_modes() {
    let codec = RecordCodec::default();
    let image = Image::new_2d(5, 5, (0..25).collect()).unwrap();

    for mode in MODES {
        let record = codec.encode(&image, mode).unwrap();
        let decoded = codec.decode(&record).unwrap();
        assert_eq!(decoded, image, "mode {}", mode);
        assert_eq!(decoded.shape(), vec![5, 5]);
    }
}

#[test]
fn test_round_trip_noise_3d_both_modes() {
    let codec = RecordCodec::new(CodecSet::new(1, 0));
    let image = noise_3d(64, 48, 3, 42);

    for mode in MODES {
        let record = codec.encode(&image, mode).unwrap();
        assert_eq!(codec.decode(&record).unwrap(), image, "mode {}", mode);
    }
}

#[test]
fn test_round_trip_empty_image() {
    let codec = RecordCodec::default();
    let image = Image::new_2d(0, 10, vec![]).unwrap();

    let record = codec.encode(&image, CompressionMode::Zstd).unwrap();
    let decoded = codec.decode(&record).unwrap();

    assert_eq!(decoded.shape(), vec![0, 10]);
}

#[test]
fn test_single_channel_3d_decodes_as_2d() {
    let codec = RecordCodec::default();
    let image = Image::new_3d(4, 4, 1, (0..16).collect()).unwrap();

    let decoded = codec
        .decode(&codec.encode(&image, CompressionMode::Lz4).unwrap())
        .unwrap();

    assert_eq!(decoded.shape(), vec![4, 4]);
    assert_eq!(decoded.as_bytes(), image.as_bytes());
}

// =============================================================================
// Malformed Record Tests
// =============================================================================

#[test]
fn test_decode_short_record() {
    let codec = RecordCodec::default();

    assert!(matches!(
        codec.decode(&[0, 0, 5]),
        Err(IidbError::MalformedRecord(_))
    ));
}

#[test]
fn test_decode_unknown_mode() {
    let codec = RecordCodec::default();
    let mut record = codec.encode(&ramp_2d(5, 5, 0), CompressionMode::Zstd).unwrap();
    record[0] = 7;

    assert!(matches!(
        codec.decode(&record),
        Err(IidbError::UnsupportedCompressionMode(7))
    ));
}

#[test]
fn test_decode_length_mismatch() {
    let codec = RecordCodec::default();

    for mode in MODES {
        let mut record = codec.encode(&ramp_2d(5, 5, 0), mode).unwrap();
        // Claim a smaller image than the payload holds
        record[2..4].copy_from_slice(&4u16.to_le_bytes());

        assert!(
            matches!(codec.decode(&record), Err(IidbError::MalformedRecord(_))),
            "mode {}",
            mode
        );
    }
}

#[test]
fn test_decode_oversized_header_is_malformed() {
    let codec = RecordCodec::default();

    for mode in MODES {
        // 65535^3 bytes claimed, 25 bytes actually compressed
        let payload = codec.codecs().compress(mode.as_u16(), &[0u8; 25]).unwrap();
        let mut record = header::encode(mode.as_u16(), 65535, 65535, 65535).to_vec();
        record.extend_from_slice(&payload);

        assert!(
            matches!(codec.decode(&record), Err(IidbError::MalformedRecord(_))),
            "mode {}",
            mode
        );
        assert!(
            matches!(codec.check(&record), Err(IidbError::MalformedRecord(_))),
            "mode {}",
            mode
        );
    }
}

#[test]
fn test_check_accepts_encoded_record() {
    let codec = RecordCodec::default();

    for mode in MODES {
        let record = codec.encode(&ramp_3d(6, 4, 3), mode).unwrap();
        let header = codec.check(&record).unwrap();

        assert_eq!((header.height, header.width, header.channels), (6, 4, 3));
    }
}

#[test]
fn test_decode_zero_channels() {
    let codec = RecordCodec::default();
    let mut record = codec.encode(&ramp_2d(5, 5, 0), CompressionMode::Zstd).unwrap();
    record[6..8].copy_from_slice(&0u16.to_le_bytes());

    assert!(matches!(
        codec.decode(&record),
        Err(IidbError::MalformedRecord(_))
    ));
}

// =============================================================================
// Header-only Read Tests
// =============================================================================

#[test]
fn test_decode_dimensions_matches_full_decode() {
    let codec = RecordCodec::default();
    let image = ramp_3d(5, 5, 3);
    let record = codec.encode(&image, CompressionMode::Zstd).unwrap();

    let decoded = codec.decode(&record).unwrap();
    assert_eq!(
        decode_dimensions(&record).unwrap(),
        (decoded.height() as u16, decoded.width() as u16)
    );
}

#[test]
fn test_decode_dimensions_ignores_corrupt_payload() {
    let mut record = header::encode(1, 480, 640, 3).to_vec();
    record.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

    assert_eq!(decode_dimensions(&record).unwrap(), (480, 640));
    assert!(RecordCodec::default().decode(&record).is_err());
}

// =============================================================================
// Parallel Decode Tests
// =============================================================================

#[test]
fn test_decode_parallel_preserves_order() {
    let codec = RecordCodec::default();
    let images: Vec<Image> = (0..17).map(|i| ramp_2d(8, 8, i as u8)).collect();
    let records: Vec<Vec<u8>> = images
        .iter()
        .enumerate()
        .map(|(i, img)| codec.encode(img, MODES[i % 2]).unwrap())
        .collect();

    for threads in [1, 2, 4, 32] {
        let decoded = codec.decode_parallel(&records, threads).unwrap();
        assert_eq!(decoded, images, "threads {}", threads);
    }
}

#[test]
fn test_decode_parallel_reports_failure() {
    let codec = RecordCodec::default();
    let mut records: Vec<Vec<u8>> = (0..6)
        .map(|i| codec.encode(&ramp_2d(4, 4, i), CompressionMode::Zstd).unwrap())
        .collect();
    records[4].truncate(3);

    let result = codec.decode_parallel(&records, 3);
    assert!(matches!(result, Err(IidbError::MalformedRecord(_))));
}

#[test]
fn test_decode_parallel_empty() {
    let codec = RecordCodec::default();
    let records: Vec<Vec<u8>> = Vec::new();

    assert!(codec.decode_parallel(&records, 4).unwrap().is_empty());
}

#[test]
fn test_decode_stacked_fills_slots_in_order() {
    let codec = RecordCodec::default();
    let images: Vec<Image> = (0..5).map(|i| ramp_2d(3, 4, i * 20)).collect();
    let records: Vec<Vec<u8>> = images
        .iter()
        .map(|img| codec.encode(img, CompressionMode::Lz4).unwrap())
        .collect();

    let mut out = vec![0u8; 5 * 12];
    codec.decode_stacked(&records, &mut out, 2).unwrap();

    for (i, image) in images.iter().enumerate() {
        assert_eq!(&out[i * 12..(i + 1) * 12], image.as_bytes());
    }
}

#[test]
fn test_decode_stacked_rejects_wrong_slot_size() {
    let codec = RecordCodec::default();
    let records = vec![codec.encode(&ramp_2d(3, 4, 0), CompressionMode::Zstd).unwrap()];

    let mut out = vec![0u8; 10];
    assert!(matches!(
        codec.decode_stacked(&records, &mut out, 1),
        Err(IidbError::ShapeMismatch(_))
    ));
}
