//! Store Module
//!
//! The public facade: images in, images out, keyed by integer or string.
//!
//! ## Responsibilities
//! - Own the engine connection and its open/closed lifecycle
//! - Canonicalize keys before they reach the engine
//! - Run every operation inside exactly one engine transaction
//! - Refuse writes on read-only handles before touching the engine

use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::compression::{CodecSet, CompressionMode};
use crate::config::Config;
use crate::error::{IidbError, Result};
use crate::header::RecordHeader;
use crate::image::{Image, ImageStack};
use crate::key::Key;
use crate::record::{self, RecordCodec};
use crate::storage::{Backend, OpenMode, ReadTxn};

/// Handle on one image store file
///
/// ## Lifecycle: Open(readonly | read-write) → Closed
///
/// - Data operations hold the read side of `backend` for their whole
///   transaction; the read side is taken recursively, so `Store` calls
///   nest inside [`Store::with_snapshot`]
/// - `close()` takes the write side, so it waits for in-flight operations
///   and nothing runs against a released connection
/// - Closed is terminal; open a new handle to continue
///
/// ## Concurrency
/// Reads run concurrently under snapshot isolation. Writes are serialized
/// by the engine; a `put_multi` is one write transaction. Any number of
/// handles, in this or other processes, may read the same file. Handles on
/// one file in one process share the engine environment and must be opened
/// with the same `readonly`, `lock` and `map_size`.
pub struct Store {
    config: Config,
    codec: RecordCodec,
    backend: RwLock<Option<Backend>>,
}

impl Store {
    /// Open a store with the given config
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let backend = Backend::open(
            &config.path,
            OpenMode {
                readonly: config.readonly,
                lock: config.lock,
                map_size: config.map_size,
            },
        )?;
        let codec = RecordCodec::new(CodecSet::new(config.zstd_level, config.lz4_level));

        tracing::debug!(
            path = %config.path.display(),
            readonly = config.readonly,
            mode = %config.compression,
            "store opened"
        );

        Ok(Self {
            config,
            codec,
            backend: RwLock::new(Some(backend)),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the given path and access mode
    pub fn open_path(path: impl AsRef<Path>, readonly: bool) -> Result<Self> {
        let config = Config {
            path: path.as_ref().to_path_buf(),
            readonly,
            ..Config::default()
        };
        Self::open(config)
    }

    /// Release the connection. Idempotent.
    pub fn close(&self) {
        if self.backend.write().take().is_some() {
            tracing::debug!(path = %self.config.path.display(), "store closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.backend.read_recursive().is_none()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Run `f` against one consistent snapshot of the store
    ///
    /// Everything `f` returns is owned; borrowed engine buffers cannot
    /// outlive the closure. Writes made from inside `f` commit normally but
    /// are not visible through the snapshot.
    ///
    /// `f` must not call [`Store::close`] on this handle: close waits for the
    /// snapshot to finish and deadlocks.
    pub fn with_snapshot<T>(&self, f: impl FnOnce(&Snapshot<'_>) -> Result<T>) -> Result<T> {
        let backend = self.backend()?;
        let snapshot = Snapshot {
            txn: backend.begin_read()?,
            codec: &self.codec,
        };
        f(&snapshot)
    }

    /// Get the image stored under `key`
    pub fn get(&self, key: impl Into<Key>) -> Result<Image> {
        let key = key.into();
        self.with_snapshot(|snap| snap.get(&key))
    }

    /// Get many images from one snapshot, in input order
    ///
    /// Stops at the first missing key with `KeyNotFound`; no partial results.
    /// Records are copied out of the snapshot first, then decompressed on up
    /// to `decode_threads` workers.
    pub fn get_multi<I>(&self, keys: I) -> Result<Vec<Image>>
    where
        I: IntoIterator,
        I::Item: Into<Key>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();

        let records = self.fetch_raw(&keys)?;

        tracing::trace!(count = records.len(), "decoding batch");
        self.codec
            .decode_parallel(&records, self.config.decode_threads)
    }

    /// Get many equally-shaped images as one `(n, h, w[, c])` buffer
    ///
    /// Each payload is decompressed straight into its slot. Fails with
    /// `ShapeMismatch` if the stored shapes differ.
    pub fn get_multi_stacked<I>(&self, keys: I) -> Result<ImageStack>
    where
        I: IntoIterator,
        I::Item: Into<Key>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Ok(ImageStack::empty());
        }

        let records = self.fetch_raw(&keys)?;

        // Step 1: All headers must agree on the shape and fit their payloads
        let first = self.codec.check(&records[0])?;
        for bytes in &records[1..] {
            let header = self.codec.check(bytes)?;
            if (header.height, header.width, header.channels)
                != (first.height, first.width, first.channels)
            {
                return Err(IidbError::ShapeMismatch(
                    "images not all the same shape".to_string(),
                ));
            }
        }

        // Step 2: Decompress each record into its slot of the output buffer
        let total = first
            .decoded_len()
            .checked_mul(records.len())
            .ok_or_else(|| {
                IidbError::MalformedRecord(format!(
                    "{} records of {}x{}x{} overflow the address space",
                    records.len(),
                    first.height,
                    first.width,
                    first.channels
                ))
            })?;
        let mut data = vec![0u8; total];
        self.codec
            .decode_stacked(&records, &mut data, self.config.decode_threads)?;

        let channels = (first.channels != 1).then_some(usize::from(first.channels));
        Ok(ImageStack::new(
            data,
            records.len(),
            usize::from(first.height),
            usize::from(first.width),
            channels,
        ))
    }

    /// Whether a record exists under `key`
    pub fn contains(&self, key: impl Into<Key>) -> Result<bool> {
        let key = key.into();
        self.with_snapshot(|snap| snap.contains(&key))
    }

    /// `(height, width)` from the header only
    pub fn get_dimensions(&self, key: impl Into<Key>) -> Result<(u16, u16)> {
        let key = key.into();
        self.with_snapshot(|snap| snap.get_dimensions(&key))
    }

    /// Full header (mode, height, width, channels) without decompressing
    pub fn get_shape(&self, key: impl Into<Key>) -> Result<RecordHeader> {
        let key = key.into();
        self.with_snapshot(|snap| snap.get_shape(&key))
    }

    /// Number of stored records, from engine metadata
    pub fn len(&self) -> Result<u64> {
        self.with_snapshot(|snap| snap.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store `image` under `key` with the default mode (last write wins)
    pub fn put(&self, key: impl Into<Key>, image: &Image) -> Result<()> {
        self.put_with_mode(key, image, self.config.compression)
    }

    /// Store `image` under `key` with an explicit mode
    pub fn put_with_mode(
        &self,
        key: impl Into<Key>,
        image: &Image,
        mode: CompressionMode,
    ) -> Result<()> {
        let backend = self.writable("put")?;
        let key = key.into();

        let record = self.codec.encode(image, mode)?;

        let mut txn = backend.begin_write()?;
        txn.put(key.canonical().as_bytes(), &record)?;
        txn.commit()?;

        tracing::trace!(key = %key, bytes = record.len(), "put");
        Ok(())
    }

    /// Store many images atomically with the default mode
    ///
    /// Every image is encoded before the write transaction opens; a failure
    /// anywhere leaves the store unchanged.
    pub fn put_multi<'a, I, K>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, &'a Image)>,
        K: Into<Key>,
    {
        let backend = self.writable("put_multi")?;
        let mode = self.config.compression;

        // Step 1: Encode everything up front
        let encoded = items
            .into_iter()
            .map(|(key, image)| {
                let key = key.into().to_bytes();
                self.codec.encode(image, mode).map(|record| (key, record))
            })
            .collect::<Result<Vec<_>>>()?;

        if encoded.is_empty() {
            return Ok(());
        }

        // Step 2: One write transaction for the whole batch
        let mut txn = backend.begin_write()?;
        let written = txn.put_many(
            encoded
                .iter()
                .map(|(key, record)| (key.as_slice(), record.as_slice())),
        )?;
        txn.commit()?;

        tracing::trace!(count = written, "put_multi");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn is_readonly(&self) -> bool {
        self.config.readonly
    }

    /// Mode used by `put` and `put_multi`
    pub fn default_mode(&self) -> CompressionMode {
        self.config.compression
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn backend(&self) -> Result<MappedRwLockReadGuard<'_, Backend>> {
        RwLockReadGuard::try_map(self.backend.read_recursive(), |b| b.as_ref())
            .map_err(|_| IidbError::ClosedStore)
    }

    /// Raw records for `keys` from one snapshot, stopping at the first miss
    fn fetch_raw(&self, keys: &[Key]) -> Result<Vec<Vec<u8>>> {
        self.with_snapshot(|snap| {
            keys.iter()
                .map(|key| snap.raw(key)?.ok_or_else(|| not_found(key)))
                .collect()
        })
    }

    fn writable(&self, op: &'static str) -> Result<MappedRwLockReadGuard<'_, Backend>> {
        let backend = self.backend()?;
        if self.config.readonly {
            return Err(IidbError::ReadOnlyViolation(op));
        }
        Ok(backend)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IIDB(path={:?}, readonly={})",
            self.config.path.display().to_string(),
            self.config.readonly
        )
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Read view over one engine snapshot, see [`Store::with_snapshot`]
pub struct Snapshot<'a> {
    txn: ReadTxn<'a>,
    codec: &'a RecordCodec,
}

impl Snapshot<'_> {
    /// Decode the image under `key`
    pub fn get(&self, key: &Key) -> Result<Image> {
        self.txn
            .with_value(key.canonical().as_bytes(), |bytes| self.codec.decode(bytes))?
            .ok_or_else(|| not_found(key))
    }

    pub fn contains(&self, key: &Key) -> Result<bool> {
        self.txn.contains(key.canonical().as_bytes())
    }

    /// `(height, width)` from the header only
    pub fn get_dimensions(&self, key: &Key) -> Result<(u16, u16)> {
        self.txn
            .with_value(key.canonical().as_bytes(), record::decode_dimensions)?
            .ok_or_else(|| not_found(key))
    }

    /// Full header without decompressing
    pub fn get_shape(&self, key: &Key) -> Result<RecordHeader> {
        self.txn
            .with_value(key.canonical().as_bytes(), RecordHeader::decode)?
            .ok_or_else(|| not_found(key))
    }

    pub fn len(&self) -> Result<u64> {
        self.txn.entry_count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Owned copy of the raw record under `key`
    fn raw(&self, key: &Key) -> Result<Option<Vec<u8>>> {
        self.txn.get(key.canonical().as_bytes())
    }
}

/// Open a store (module-level shorthand)
///
/// `mode` becomes the default compression mode for writes.
pub fn open(path: impl Into<PathBuf>, readonly: bool, mode: CompressionMode) -> Result<Store> {
    let config = Config::builder()
        .path(path)
        .readonly(readonly)
        .compression(mode)
        .build()?;
    Store::open(config)
}

fn not_found(key: &Key) -> IidbError {
    IidbError::KeyNotFound(key.to_string())
}
