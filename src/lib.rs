//! # iidb
//!
//! Images interchange database: raster images stored compressed under
//! integer or string keys in a single transactional key-value file, with
//! enough metadata in each value to rebuild the array without a schema.
//!
//! - Fixed 8-byte record header (mode, height, width, channels)
//! - Per-record compression mode: zstd (0) or LZ4 block (1)
//! - Snapshot-isolated reads, serialized atomic writes
//! - Header-only dimension reads
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │      get / get_multi / contains / get_dimensions / len      │
//! │                  put / put_multi                            │
//! └──────────────┬─────────────────────────────┬────────────────┘
//!                │                             │
//!                ▼                             ▼
//!   ┌─────────────────────────┐      ┌──────────────────┐
//!   │      RecordCodec        │      │     Backend      │
//!   │  header || payload      │      │  (LMDB, 1 file)  │
//!   └──────┬───────────┬──────┘      └──────────────────┘
//!          │           │
//!          ▼           ▼
//!   ┌────────────┐ ┌────────────┐
//!   │   Header   │ │  CodecSet  │
//!   │  (8 bytes) │ │ zstd / lz4 │
//!   └────────────┘ └────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use iidb::{Image, Store};
//!
//! let store = Store::open_path("images.iidb", false)?;
//! let image = Image::new_2d(5, 5, (0..25).collect())?;
//! store.put(123, &image)?;
//! assert_eq!(store.get("123")?, image);
//! # Ok::<(), iidb::IidbError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod image;
pub mod header;
pub mod compression;
pub mod record;
pub mod storage;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{IidbError, Result};
pub use config::Config;
pub use compression::{zstd_version, CompressionMode};
pub use header::RecordHeader;
pub use image::{Image, ImageStack};
pub use key::Key;
pub use record::RecordCodec;
pub use store::{open, Snapshot, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of iidb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
