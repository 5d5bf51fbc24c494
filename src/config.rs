//! Configuration for iidb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::thread;

use crate::compression::CompressionMode;
use crate::error::{IidbError, Result};

/// 1 TiB of address space; the file only grows as records are written
pub const DEFAULT_MAP_SIZE: usize = 1 << 40;

/// Main configuration for a store handle
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the single store file (no directory is created)
    pub path: PathBuf,

    /// Reject every write operation when set
    pub readonly: bool,

    /// Use the engine's reader lock table. Only read-only handles may turn
    /// it off, and only while no writer touches the file.
    pub lock: bool,

    /// Memory map size, the upper bound of the file size
    pub map_size: usize,

    // -------------------------------------------------------------------------
    // Compression Configuration
    // -------------------------------------------------------------------------
    /// Mode used by `put` / `put_multi` when no override is given
    pub compression: CompressionMode,

    /// zstd compression level (mode 0)
    pub zstd_level: i32,

    /// LZ4 effort (mode 1): 0 selects the fast compressor, >0 the HC one
    pub lz4_level: i32,

    // -------------------------------------------------------------------------
    // Batch Configuration
    // -------------------------------------------------------------------------
    /// Worker threads used to decompress `get_multi` batches
    pub decode_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./images.iidb"),
            readonly: true,
            lock: true,
            map_size: DEFAULT_MAP_SIZE,
            compression: CompressionMode::Zstd,
            zstd_level: 7,
            lz4_level: 7,
            decode_threads: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check values the engine or codecs would otherwise reject later
    pub fn validate(&self) -> Result<()> {
        if self.decode_threads == 0 {
            return Err(IidbError::Config(
                "decode_threads must be at least 1".to_string(),
            ));
        }

        if !self.lock && !self.readonly {
            return Err(IidbError::Config(
                "lock can only be disabled on readonly handles".to_string(),
            ));
        }

        if self.map_size == 0 {
            return Err(IidbError::Config("map_size must be non-zero".to_string()));
        }

        let levels = zstd::compression_level_range();
        if !levels.contains(&self.zstd_level) {
            return Err(IidbError::Config(format!(
                "zstd_level {} outside {}..={}",
                self.zstd_level,
                levels.start(),
                levels.end()
            )));
        }

        if self.lz4_level < 0 {
            return Err(IidbError::Config(format!(
                "lz4_level must be >= 0, got {}",
                self.lz4_level
            )));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Open read-only (true) or read-write (false)
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.config.readonly = readonly;
        self
    }

    /// Enable or disable the reader lock table (readonly handles only)
    pub fn lock(mut self, lock: bool) -> Self {
        self.config.lock = lock;
        self
    }

    /// Set the memory map size (in bytes)
    pub fn map_size(mut self, bytes: usize) -> Self {
        self.config.map_size = bytes;
        self
    }

    /// Set the default compression mode
    pub fn compression(mut self, mode: CompressionMode) -> Self {
        self.config.compression = mode;
        self
    }

    /// Set the zstd compression level
    pub fn zstd_level(mut self, level: i32) -> Self {
        self.config.zstd_level = level;
        self
    }

    /// Set the LZ4 effort level
    pub fn lz4_level(mut self, level: i32) -> Self {
        self.config.lz4_level = level;
        self
    }

    /// Set the number of batch decode threads
    pub fn decode_threads(mut self, count: usize) -> Self {
        self.config.decode_threads = count;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
