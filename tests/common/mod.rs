//! Shared test helpers

#![allow(dead_code)]

use std::path::PathBuf;

use iidb::config::Config;
use iidb::{CompressionMode, Image, Store};
use tempfile::TempDir;

/// Install a test-writer subscriber once; filter with RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fresh directory plus the store file path inside it
pub fn temp_store_path() -> (TempDir, PathBuf) {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.iidb");
    (temp_dir, path)
}

/// Read-write store in a fresh directory
pub fn setup_temp_store(mode: CompressionMode) -> (TempDir, PathBuf, Store) {
    let (temp_dir, path) = temp_store_path();
    let config = Config::builder()
        .path(&path)
        .readonly(false)
        .compression(mode)
        .decode_threads(4)
        .build()
        .unwrap();
    let store = Store::open(config).unwrap();
    (temp_dir, path, store)
}

/// `(h, w)` image with samples `start, start+1, ...` (wrapping)
pub fn ramp_2d(height: usize, width: usize, start: u8) -> Image {
    let data = (0..height * width)
        .map(|i| start.wrapping_add(i as u8))
        .collect();
    Image::new_2d(height, width, data).unwrap()
}

/// `(h, w, c)` image with samples `0, 1, 2, ...` (wrapping)
pub fn ramp_3d(height: usize, width: usize, channels: usize) -> Image {
    let data = (0..height * width * channels).map(|i| i as u8).collect();
    Image::new_3d(height, width, channels, data).unwrap()
}

/// Pseudo-random noise; compresses poorly
pub fn noise_3d(height: usize, width: usize, channels: usize, seed: u32) -> Image {
    let mut state = seed.max(1);
    let data = (0..height * width * channels)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect();
    Image::new_3d(height, width, channels, data).unwrap()
}
