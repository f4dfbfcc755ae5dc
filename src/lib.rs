//! # latch-drive
//!
//! An embedded, on-disk, single-process key–value store backed by three
//! memory-mapped files: a linear-probed hash index, an append-only key
//! blob region, and an append-only value blob region. It targets hosts
//! that need durable, low-latency byte-string lookups with crash-safe
//! single-item updates — not multi-process access, multi-key
//! transactions, or range queries.
//!
//! ## Example
//! ```rust
//! use latch_drive::{Engine, EngineConfig};
//! use tempfile::tempdir;
//!
//! let dir = tempdir().expect("failed to create temp dir");
//! let engine = Engine::open(dir.path(), EngineConfig::default()).unwrap();
//!
//! engine.put(b"key1", b"value1").unwrap();
//! assert_eq!(engine.get(b"key1").unwrap(), Some(b"value1".to_vec()));
//!
//! engine.put(b"key1", b"a new value").unwrap();
//! assert_eq!(engine.get(b"key1").unwrap(), Some(b"a new value".to_vec()));
//!
//! engine.del(b"key1").unwrap();
//! assert_eq!(engine.get(b"key1").unwrap(), None);
//! ```
//!
//! ## On-disk layout
//! - `<dir>/meta` — three-line text file naming the current index, key,
//!   and value generation files.
//! - `<dir>/index_*` — fixed 64-byte header plus linearly probed 20-byte
//!   slots (see [`storage_engine`]).
//! - `<dir>/key_*`, `<dir>/value_*` — append-only byte arenas.
//!
//! ## Concurrency
//! A single writer (serialized internally) can run concurrently with any
//! number of lock-free readers, and with the engine's own background
//! maintenance thread, which performs asynchronous compaction and
//! stale-generation-file cleanup. There is no support for multiple
//! *processes* sharing a directory.
//!
//! ## Safety notes
//! - Values larger than 65,535 bytes and keys larger than 255 bytes are
//!   rejected at the API boundary.
//! - Durability is whatever the host OS provides for a shared
//!   (`MAP_SHARED`) mapping without explicit flushes, except for the
//!   `meta` file, which is fsync'd on every rewrite.
//! - Crash recovery covers a single torn slot update; it does not cover
//!   damaged headers or blob regions.

pub mod storage_engine;
pub use storage_engine::{BlobRegion, ByteBuffer, Engine, EngineConfig, EngineStats, Index, Meta};

pub mod utils;
