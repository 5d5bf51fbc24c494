//! Storage Module
//!
//! Adapter over the transactional key-value engine (LMDB through `heed`)
//! that holds the records.
//!
//! ## Responsibilities
//! - Open the single store file, read-only or read-write, locked or not
//! - Hand out read transactions (snapshot views) and write transactions
//! - Translate engine failures into `IidbError::StorageEngine`
//!
//! The engine owns paging and durability. Readers see a consistent
//! snapshot while a writer is active; at most one write transaction is open
//! at a time and it becomes visible only on commit. Any number of threads
//! and processes may map the same file for reading.
//!
//! ## Layout
//! ```text
//! store file            (+ "<file>-lock" reader table when locking)
//! └── main database: canonical key bytes → header || payload
//! ```

mod backend;

pub use backend::{Backend, OpenMode, ReadTxn, WriteTxn};
