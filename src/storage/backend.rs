//! Engine backend
//!
//! Thin wrapper over an LMDB environment (`heed`) exposing exactly the
//! contract the store needs: begin read/write, get, put, put_many, entry
//! count.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvFlags, EnvOpenOptions, MdbError, RoTxn, RwTxn};
use parking_lot::Mutex;

use crate::error::Result;

/// Records live in the environment's unnamed main database
type Records = Database<Bytes, Bytes>;

/// Live backends per environment (canonical path) in this process.
///
/// heed hands every opener of one path the same `Env` and keeps it
/// registered until `prepare_for_closing`; the last backend out calls it.
static OPEN_HANDLES: Mutex<BTreeMap<PathBuf, usize>> = Mutex::new(BTreeMap::new());

/// How a backend maps and locks the store file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub readonly: bool,
    /// Use the engine's reader table; only read-only handles may turn it off
    pub lock: bool,
    /// Upper bound of the memory map, i.e. of the file size
    pub map_size: usize,
}

impl OpenMode {
    fn flags(&self) -> EnvFlags {
        let mut flags = EnvFlags::NO_SUB_DIR | EnvFlags::NO_TLS;
        if self.readonly {
            flags |= EnvFlags::READ_ONLY;
            if !self.lock {
                flags |= EnvFlags::NO_LOCK;
            }
        }
        flags
    }
}

/// One open connection to the engine
pub struct Backend {
    env: Env,
    records: Records,
    path: PathBuf,
}

impl Backend {
    /// Open the store file
    ///
    /// Read-write handles create the file (never a directory) if missing.
    /// Read-only handles require the file to exist. Handles on one file in
    /// one process share the environment, so they must agree on `mode`.
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        let mut options = EnvOpenOptions::new();
        options.map_size(mode.map_size);

        // SAFETY: the flags only select file layout, read-only access and
        // whether the reader lock table is used. With NO_LOCK the caller
        // accepts that no writer may recycle pages under this reader.
        unsafe {
            options.flags(mode.flags());
        }

        let env = {
            let mut handles = OPEN_HANDLES.lock();
            let env = open_env(&options, path)?;
            *handles.entry(env.path().to_path_buf()).or_insert(0) += 1;
            env
        };

        let records = match open_records(&env, mode.readonly) {
            Ok(records) => records,
            Err(e) => {
                release(&env);
                return Err(e);
            }
        };

        tracing::debug!(
            path = %path.display(),
            readonly = mode.readonly,
            lock = mode.lock,
            "opened store file"
        );

        Ok(Self {
            env,
            records,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin a snapshot read
    pub fn begin_read(&self) -> Result<ReadTxn<'_>> {
        Ok(ReadTxn {
            txn: self.env.read_txn()?,
            records: self.records,
        })
    }

    /// Begin the (single) write transaction; blocks behind an active writer
    pub fn begin_write(&self) -> Result<WriteTxn<'_>> {
        Ok(WriteTxn {
            txn: self.env.write_txn()?,
            records: self.records,
        })
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        release(&self.env);
    }
}

/// Records database: created by writers, looked up by readers
fn open_records(env: &Env, readonly: bool) -> Result<Records> {
    if readonly {
        let rtxn = env.read_txn()?;
        let records = env.open_database::<Bytes, Bytes>(&rtxn, None)?;
        records.ok_or_else(|| heed::Error::Mdb(MdbError::NotFound).into())
    } else {
        let mut wtxn = env.write_txn()?;
        let records = env.create_database::<Bytes, Bytes>(&mut wtxn, None)?;
        wtxn.commit()?;
        Ok(records)
    }
}

/// Drop one backend's claim on `env`; the last claim unregisters it so the
/// environment closes with its final `Env` handle
fn release(env: &Env) {
    let mut handles = OPEN_HANDLES.lock();
    let key = env.path();

    let remaining = match handles.get_mut(key) {
        Some(count) => {
            *count = count.saturating_sub(1);
            *count
        }
        None => 0,
    };

    if remaining == 0 {
        handles.remove(key);
        let _closing = env.clone().prepare_for_closing();
        tracing::debug!(path = %key.display(), "released store file");
    }
}

/// Open (or join) the environment at `path`
///
/// A concurrent release of the same file is waited out and retried.
fn open_env(options: &EnvOpenOptions, path: &Path) -> Result<Env> {
    loop {
        // SAFETY: the file is only ever mapped through this crate's handles,
        // which never truncate or rewrite it behind the engine.
        match unsafe { options.open(path) } {
            Err(heed::Error::DatabaseClosing) => {
                if let Some(closing) = path
                    .canonicalize()
                    .ok()
                    .and_then(heed::env_closing_event)
                {
                    closing.wait();
                }
            }
            result => return Ok(result?),
        }
    }
}

/// Read transaction over the records database
pub struct ReadTxn<'e> {
    txn: RoTxn<'e>,
    records: Records,
}

impl ReadTxn<'_> {
    /// Run `f` over the stored value, borrowed from the memory map for the
    /// duration of the call only
    pub fn with_value<T>(
        &self,
        key: &[u8],
        f: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<Option<T>> {
        match self.records.get(&self.txn, key)? {
            Some(value) => f(value).map(Some),
            None => Ok(None),
        }
    }

    /// Owned copy of the stored value
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_value(key, |value| Ok(value.to_vec()))
    }

    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        self.with_value(key, |_| Ok(())).map(|found| found.is_some())
    }

    /// Entry count from database statistics (no scan)
    pub fn entry_count(&self) -> Result<u64> {
        Ok(self.records.len(&self.txn)?)
    }
}

/// Write transaction; dropped without `commit` it aborts
pub struct WriteTxn<'e> {
    txn: RwTxn<'e>,
    records: Records,
}

impl WriteTxn<'_> {
    /// Insert or overwrite one value
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.records.put(&mut self.txn, key, value)?;
        Ok(())
    }

    /// Insert or overwrite many values, returning how many were written
    pub fn put_many<'a, I>(&mut self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
    {
        let mut written = 0;
        for (key, value) in items {
            self.records.put(&mut self.txn, key, value)?;
            written += 1;
        }
        Ok(written)
    }

    pub fn commit(self) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }
}
