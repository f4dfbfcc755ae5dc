//! The public `Engine`: `get`/`put`/`del`/`compact` over a directory of
//! index/key/value generation files, reader–writer coordination via a
//! reader counter (§5.2), and the background maintenance thread that
//! drives asynchronous compaction and stale-generation-file cleanup.

use super::blob_region::BlobRegion;
use super::constants::{MAX_KEY_LEN, MAX_VALUE_LEN, MIN_KEY_LEN};
use super::index::{Index, WriteOutcome};
use super::meta::Meta;
use crate::utils::verify_file_existence;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

const MSG_EXIT: u8 = 0x1;
const MSG_COMPACT: u8 = 0x2;
const MSG_CLEAN_FILES: u8 = 0x4;

/// Sizing and maintenance knobs passed at `Engine::open` (§6.4 — all
/// configuration lives here; there is no environment-variable or
/// global-default surface in the engine itself).
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub index_init_bytes: u64,
    pub key_init_bytes: u64,
    pub value_init_bytes: u64,
    /// Expand the index once `key_count / capacity` exceeds this. Must be
    /// in `(0, 1)`.
    pub hash_factor: f32,
    /// Post a background compaction once `updated_count` exceeds this.
    pub autocompact_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_init_bytes: 4096,
            key_init_bytes: 4096,
            value_init_bytes: 4096,
            hash_factor: 0.75,
            autocompact_threshold: 1024,
        }
    }
}

fn validate_key(key: &[u8]) -> io::Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("key length {} outside the allowed range {}..={}", key.len(), MIN_KEY_LEN, MAX_KEY_LEN),
        ));
    }
    Ok(())
}

fn validate_value(value: &[u8]) -> io::Result<()> {
    if value.len() > MAX_VALUE_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("value length {} exceeds the maximum of {MAX_VALUE_LEN}", value.len()),
        ));
    }
    Ok(())
}

/// Everything the background maintenance thread needs shared ownership
/// of. Split out from `Engine` so the thread can hold an `Arc<Shared>`
/// independent of the handle's own lifetime, and `Engine::drop` can post
/// `MSG_EXIT` and join without the thread needing to own the handle.
struct Shared {
    dir: PathBuf,
    reading_count: AtomicI32,
    writer_lock: Mutex<()>,
    meta: Mutex<Meta>,
    index: std::cell::UnsafeCell<Arc<Index>>,
    key_region: std::cell::UnsafeCell<Arc<BlobRegion>>,
    value_region: std::cell::UnsafeCell<Arc<BlobRegion>>,
    hash_factor: f32,
    autocompact_threshold: u32,
    message: Mutex<u8>,
    message_cond: Condvar,
}

// SAFETY: `index`/`key_region`/`value_region` are only ever mutated by
// the single writer (serialized by `writer_lock`) and only while
// `reading_count` has been driven to -1 by `swap_storage`, which no
// concurrent reader can observe mid-swap (§5.2, §5.4).
unsafe impl Sync for Shared {}
unsafe impl Send for Shared {}

/// RAII guard for a single in-flight reader, implementing the §5.2
/// reader-counter protocol: spins while a swap is in progress (-1),
/// otherwise CAS-increments.
struct ReaderGuard<'a> {
    shared: &'a Shared,
}

impl<'a> ReaderGuard<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let mut observed = shared.reading_count.load(Ordering::SeqCst);
        loop {
            if observed == -1 {
                thread::yield_now();
                observed = shared.reading_count.load(Ordering::SeqCst);
                continue;
            }
            match shared
                .reading_count
                .compare_exchange(observed, observed + 1, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return ReaderGuard { shared },
                Err(current) => observed = current,
            }
        }
    }
}

impl Drop for ReaderGuard<'_> {
    fn drop(&mut self) {
        self.shared.reading_count.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Shared {
    fn current_index(&self) -> Arc<Index> {
        // SAFETY: see the `Sync`/`Send` impls above.
        unsafe { (*self.index.get()).clone() }
    }

    fn current_key_region(&self) -> Arc<BlobRegion> {
        unsafe { (*self.key_region.get()).clone() }
    }

    fn current_value_region(&self) -> Arc<BlobRegion> {
        unsafe { (*self.value_region.get()).clone() }
    }

    /// Drives the reader counter from 0 to -1, runs `f` (pointer
    /// replacement plus, where applicable, the Meta rewrite — kept in
    /// the same gated section so a crash never leaves Meta pointing at a
    /// path the swap hasn't yet installed), then releases readers.
    /// `f` must be metadata-only: no I/O that could block indefinitely
    /// while readers spin (§5.4).
    fn swap_storage(&self, f: impl FnOnce()) {
        loop {
            if self
                .reading_count
                .compare_exchange(0, -1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                f();
                self.reading_count.store(0, Ordering::SeqCst);
                return;
            }
            thread::yield_now();
        }
    }

    fn post_message(&self, bits: u8) {
        let mut message = self.message.lock().unwrap();
        *message |= bits;
        self.message_cond.notify_all();
    }

    fn get(&self, key: &[u8]) -> io::Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let _reader = ReaderGuard::enter(self);
        let index = self.current_index();
        let keys = self.current_key_region();
        let values = self.current_value_region();
        Ok(index.read(&keys, &values, key))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> io::Result<()> {
        validate_key(key)?;
        validate_value(value)?;
        let _writer = self.writer_lock.lock().unwrap();

        let index = self.current_index();
        let mut keys = self.current_key_region();
        let mut values = self.current_value_region();
        let mut outcome = index.write(&keys, &values, key, value);

        if outcome == WriteOutcome::NeedGrowKey {
            self.grow_key_region()?;
            keys = self.current_key_region();
            outcome = index.write(&keys, &values, key, value);
        } else if outcome == WriteOutcome::NeedGrowValue {
            self.grow_value_region()?;
            values = self.current_value_region();
            outcome = index.write(&keys, &values, key, value);
        }

        if outcome != WriteOutcome::Ok {
            return Err(io::Error::other("put failed: region growth did not free enough space for a retry"));
        }

        if index.key_count() as f64 / index.capacity() as f64 > self.hash_factor as f64 {
            self.expand_index()?;
        }

        if index.updated_count() > self.autocompact_threshold {
            let mut message = self.message.lock().unwrap();
            // Double-checked under the message lock to avoid redundant wakeups.
            if index.updated_count() > self.autocompact_threshold {
                *message |= MSG_COMPACT;
                self.message_cond.notify_all();
            }
        }

        Ok(())
    }

    fn del(&self, key: &[u8]) -> io::Result<()> {
        validate_key(key)?;
        let _writer = self.writer_lock.lock().unwrap();
        let index = self.current_index();
        let keys = self.current_key_region();
        index.del(&keys, key);
        Ok(())
    }

    /// Caller must already hold `writer_lock` (Put's inline path does;
    /// the maintenance thread's own compaction path takes it itself).
    fn grow_key_region(&self) -> io::Result<()> {
        let current = self.current_key_region();
        let path = self.meta.lock().unwrap().key_path().to_path_buf();
        let grown = Arc::new(BlobRegion::open(&path, current.size() * 2)?);
        info!(bytes = grown.size(), "growing key region");
        self.swap_storage(|| unsafe {
            *self.key_region.get() = grown;
        });
        Ok(())
    }

    fn grow_value_region(&self) -> io::Result<()> {
        let current = self.current_value_region();
        let path = self.meta.lock().unwrap().value_path().to_path_buf();
        let grown = Arc::new(BlobRegion::open(&path, current.size() * 2)?);
        info!(bytes = grown.size(), "growing value region");
        self.swap_storage(|| unsafe {
            *self.value_region.get() = grown;
        });
        Ok(())
    }

    /// Rehashes into a fresh, doubled-capacity index file and swaps it
    /// in (§4.5.6). Caller must hold `writer_lock`.
    fn expand_index(&self) -> io::Result<()> {
        let index = self.current_index();
        let new_path = Meta::gen_index_path(&self.dir);
        let new_index = Arc::new(Index::create(&new_path, index.size() * 2)?);
        let keys = self.current_key_region();
        new_index.copy_from(&keys, &index);

        info!(path = %new_path.display(), capacity = new_index.capacity(), "expanding index");

        self.swap_storage(|| {
            unsafe {
                *self.index.get() = Arc::clone(&new_index);
            }
            if let Err(err) = self.meta.lock().unwrap().update_index_path(new_path.clone()) {
                warn!(error = %err, "failed to persist expanded index path to meta");
            }
        });

        self.post_message(MSG_CLEAN_FILES);
        Ok(())
    }

    /// Rebuilds the index (dropping tombstones) and repacks the value
    /// region, then swaps both in under one reader-counter gate (§4.5.7).
    fn run_compaction(&self) -> io::Result<()> {
        let _writer = self.writer_lock.lock().unwrap();

        let index = self.current_index();
        let new_index_path = Meta::gen_index_path(&self.dir);
        let new_value_path = Meta::gen_value_path(&self.dir);

        let new_index = Arc::new(Index::create(&new_index_path, index.size())?);
        let keys = self.current_key_region();
        new_index.copy_from(&keys, &index);

        let old_values = self.current_value_region();
        let new_values = Arc::new(BlobRegion::open(&new_value_path, old_values.size())?);
        new_index.compact(&old_values, &new_values);

        info!(
            index_path = %new_index_path.display(),
            value_path = %new_value_path.display(),
            value_pos = new_index.value_pos(),
            "compaction complete, swapping in",
        );

        self.swap_storage(|| {
            unsafe {
                *self.index.get() = Arc::clone(&new_index);
                *self.value_region.get() = Arc::clone(&new_values);
            }
            let mut meta = self.meta.lock().unwrap();
            let key_path = meta.key_path().to_path_buf();
            if let Err(err) = meta.update_all_paths(new_index_path.clone(), key_path, new_value_path.clone()) {
                warn!(error = %err, "failed to persist compacted index/value paths to meta");
            }
        });

        Ok(())
    }

    /// Snapshots the directory listing under `writer_lock`, then — after
    /// releasing it — unlinks every file that isn't the current meta,
    /// index, key, or value path (§4.5.7, §5.5).
    fn clean_files(&self) {
        let stale = {
            let _writer = self.writer_lock.lock().unwrap();
            let meta = self.meta.lock().unwrap();
            let keep: HashSet<PathBuf> = [
                meta.meta_path().to_path_buf(),
                meta.index_path().to_path_buf(),
                meta.key_path().to_path_buf(),
                meta.value_path().to_path_buf(),
            ]
            .into_iter()
            .collect();

            let entries = match fs::read_dir(meta.dir()) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(error = %err, "maintenance thread: failed to list directory for cleanup");
                    return;
                }
            };

            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| !keep.contains(path))
                .collect::<Vec<_>>()
        };

        for path in stale {
            if let Err(err) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %err, "maintenance thread: failed to remove stale generation file");
            }
        }
    }
}

fn maintenance_loop(shared: Arc<Shared>) {
    thread::sleep(Duration::from_secs(5));
    loop {
        let local_msg = {
            let mut guard = shared.message.lock().unwrap();
            while *guard == 0 {
                guard = shared.message_cond.wait(guard).unwrap();
            }
            *guard
        };

        if local_msg & MSG_EXIT != 0 {
            break;
        }

        let mut local_msg = local_msg;
        if local_msg & MSG_COMPACT != 0 {
            match shared.run_compaction() {
                Ok(()) => local_msg |= MSG_CLEAN_FILES,
                Err(err) => warn!(error = %err, "maintenance thread: compaction failed, skipping this tick"),
            }
        }

        if local_msg & MSG_CLEAN_FILES != 0 {
            shared.clean_files();
        }

        // Matches the reference implementation's end-of-tick reset: bits
        // posted while this tick was processing are dropped rather than
        // carried to the next wait, same as the source's `msg_ = 0`.
        let mut guard = shared.message.lock().unwrap();
        *guard = 0;
    }
}

/// The embedded key-value store. Cloning is not supported — there is
/// exactly one owner, and dropping it posts `MSG_EXIT` to the
/// maintenance thread and joins it (§4.5.8), which is this crate's
/// idiomatic stand-in for the reference implementation's explicit
/// `close()`.
pub struct Engine {
    shared: Arc<Shared>,
    maintenance_thread: Option<JoinHandle<()>>,
}

impl Engine {
    /// Opens (or creates) the engine's backing files under `dir` and
    /// starts the maintenance thread (§4.5.1).
    pub fn open(dir: impl AsRef<Path>, config: EngineConfig) -> io::Result<Self> {
        let dir = dir.as_ref();
        verify_file_existence(dir)?;

        if !(config.hash_factor > 0.0 && config.hash_factor < 1.0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("hash_factor must be in (0, 1), got {}", config.hash_factor),
            ));
        }

        let meta = Meta::open(dir)?;
        let index = Index::open(meta.index_path(), config.index_init_bytes)?;
        let key_region = BlobRegion::open(meta.key_path(), config.key_init_bytes)?;
        let value_region = BlobRegion::open(meta.value_path(), config.value_init_bytes)?;

        info!(
            dir = %dir.display(),
            capacity = index.capacity(),
            "engine opened",
        );

        let shared = Arc::new(Shared {
            dir: dir.to_path_buf(),
            reading_count: AtomicI32::new(0),
            writer_lock: Mutex::new(()),
            meta: Mutex::new(meta),
            index: std::cell::UnsafeCell::new(Arc::new(index)),
            key_region: std::cell::UnsafeCell::new(Arc::new(key_region)),
            value_region: std::cell::UnsafeCell::new(Arc::new(value_region)),
            hash_factor: config.hash_factor,
            autocompact_threshold: config.autocompact_threshold,
            message: Mutex::new(MSG_CLEAN_FILES),
            message_cond: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let maintenance_thread = thread::Builder::new()
            .name("latch-drive-maintenance".into())
            .spawn(move || maintenance_loop(thread_shared))?;

        Ok(Self {
            shared,
            maintenance_thread: Some(maintenance_thread),
        })
    }

    pub fn get(&self, key: &[u8]) -> io::Result<Option<Vec<u8>>> {
        self.shared.get(key)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> io::Result<()> {
        self.shared.put(key, value)
    }

    pub fn del(&self, key: &[u8]) -> io::Result<()> {
        self.shared.del(key)
    }

    /// Posts a compaction request to the maintenance thread and returns
    /// immediately (§4.5.5); compaction itself runs asynchronously.
    pub fn compact(&self) {
        self.shared.post_message(MSG_COMPACT);
    }

    /// Blocking diagnostic accessor used by the CLI's `info` command and
    /// by tests — reads the live index's counters without mutating
    /// anything (ADDED, not part of the reference `KV` surface, which
    /// has no introspection API).
    pub fn stats(&self) -> EngineStats {
        let _reader = ReaderGuard::enter(&self.shared);
        let index = self.shared.current_index();
        let keys = self.shared.current_key_region();
        let values = self.shared.current_value_region();
        EngineStats {
            key_count: index.key_count(),
            updated_count: index.updated_count(),
            capacity: index.capacity(),
            key_pos: index.key_pos(),
            value_pos: index.value_pos(),
            index_bytes: index.size(),
            key_region_bytes: keys.size(),
            value_region_bytes: values.size(),
        }
    }
}

/// Point-in-time counters surfaced for the CLI's `info` command.
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    pub key_count: u32,
    pub updated_count: u32,
    pub capacity: u32,
    pub key_pos: u64,
    pub value_pos: u64,
    pub index_bytes: u64,
    pub key_region_bytes: u64,
    pub value_region_bytes: u64,
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shared.post_message(MSG_EXIT);
        if let Some(handle) = self.maintenance_thread.take() {
            let _ = handle.join();
        }
    }
}
