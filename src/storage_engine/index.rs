//! The hash index: header bookkeeping, the linear-probe slot state
//! machine, the crash-safe single-slot write protocol, and the
//! rehash/compaction routines that move slots and value payloads between
//! generations of the on-disk files.
//!
//! See `storage_engine::constants` for the byte layout this module reads
//! and writes, and `storage_engine::index::write_info` for the atomic
//! triple that lets readers run lock-free against the single writer.

mod slot;
pub use slot::Slot;

mod write_info;
pub use write_info::{AtomicWriteInfo, WriteInfo};

use super::blob_region::BlobRegion;
use super::byte_buffer::ByteBuffer;
use super::constants::*;
use crate::utils::map_file;
use memmap2::MmapMut;
use std::cell::UnsafeCell;
use std::io;
use std::path::Path;

/// Outcome of `Index::write`. Out-of-space signals are internal to the
/// storage engine — `Engine` grows the named region and retries, they
/// never reach a caller directly (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Ok,
    NeedGrowKey,
    NeedGrowValue,
}

/// The mmap'd hash table: a 64-byte header (§3.3) followed by
/// `capacity()` 20-byte slots, linearly probed from `hash(key)`.
pub struct Index {
    mmap: UnsafeCell<MmapMut>,
    size: u64,
    write_info: AtomicWriteInfo,
}

// SAFETY: concurrent access is coordinated by `write_info` (single-slot
// seqlock) together with the engine's writer mutex and reader-counter
// gate (§5); `Index` itself only implements the raw state machine those
// protocols are built from.
unsafe impl Sync for Index {}
unsafe impl Send for Index {}

impl Index {
    /// Maps `path`, growing it to `min_size` if necessary, and recovers
    /// any single-slot torn write left by a prior crash (§4.4.1).
    pub fn open(path: &Path, min_size: u64) -> io::Result<Self> {
        let mmap = map_file(path, min_size)?;
        let size = mmap.len() as u64;
        if size < (INDEX_HEADER_LEN + SLOT_SIZE) as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("index file '{}' is smaller than one header plus one slot", path.display()),
            ));
        }
        let index = Self {
            mmap: UnsafeCell::new(mmap),
            size,
            write_info: AtomicWriteInfo::new(WriteInfo::INITIAL),
        };
        index.recover();
        Ok(index)
    }

    /// Builds an `Index` directly over an already-mapped, already-sized
    /// region. Used by callers (growth, compaction) that have just
    /// created a fresh file and don't need `open`'s recovery pass — a
    /// freshly zeroed file has no `EDITING` slot to recover.
    fn from_mmap(mmap: MmapMut) -> Self {
        let size = mmap.len() as u64;
        Self {
            mmap: UnsafeCell::new(mmap),
            size,
            write_info: AtomicWriteInfo::new(WriteInfo::INITIAL),
        }
    }

    pub fn create(path: &Path, size: u64) -> io::Result<Self> {
        let mmap = map_file(path, size)?;
        Ok(Self::from_mmap(mmap))
    }

    #[allow(clippy::mut_from_ref)]
    fn bytes_mut(&self) -> &mut [u8] {
        // SAFETY: see the `Sync`/`Send` impls above.
        unsafe { (*self.mmap.get()).as_mut() }
    }

    fn header(&self) -> &[u8] {
        &self.bytes_mut()[..INDEX_HEADER_LEN]
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn capacity(&self) -> u32 {
        ((self.size - INDEX_HEADER_LEN as u64) / SLOT_SIZE as u64) as u32
    }

    pub fn key_count(&self) -> u32 {
        u32::from_le_bytes(self.header()[KEY_COUNT_RANGE].try_into().unwrap())
    }

    pub fn updated_count(&self) -> u32 {
        u32::from_le_bytes(self.header()[UPDATED_COUNT_RANGE].try_into().unwrap())
    }

    pub fn key_pos(&self) -> u64 {
        u64::from_le_bytes(self.header()[KEY_POS_RANGE].try_into().unwrap())
    }

    pub fn value_pos(&self) -> u64 {
        u64::from_le_bytes(self.header()[VALUE_POS_RANGE].try_into().unwrap())
    }

    fn set_key_count(&self, count: u32) {
        self.bytes_mut()[KEY_COUNT_RANGE].copy_from_slice(&count.to_le_bytes());
    }

    fn set_updated_count(&self, count: u32) {
        self.bytes_mut()[UPDATED_COUNT_RANGE].copy_from_slice(&count.to_le_bytes());
    }

    fn set_key_pos(&self, pos: u64) {
        self.bytes_mut()[KEY_POS_RANGE].copy_from_slice(&pos.to_le_bytes());
    }

    fn set_value_pos(&self, pos: u64) {
        self.bytes_mut()[VALUE_POS_RANGE].copy_from_slice(&pos.to_le_bytes());
    }

    fn backup_index(&self) -> u32 {
        u32::from_le_bytes(self.header()[BACKUP_INDEX_RANGE].try_into().unwrap())
    }

    fn set_backup_index(&self, index: u32) {
        self.bytes_mut()[BACKUP_INDEX_RANGE].copy_from_slice(&index.to_le_bytes());
    }

    fn backup_slot_bytes(&self) -> [u8; SLOT_SIZE] {
        self.bytes_mut()[BACKUP_SLOT_RANGE].try_into().unwrap()
    }

    fn set_backup_slot_bytes(&self, bytes: &[u8]) {
        self.bytes_mut()[BACKUP_SLOT_RANGE].copy_from_slice(bytes);
    }

    fn slot_offset(&self, index: u32) -> usize {
        INDEX_HEADER_LEN + index as usize * SLOT_SIZE
    }

    fn slot_at(&self, index: u32) -> Slot {
        let offset = self.slot_offset(index);
        Slot::decode(&self.bytes_mut()[offset..offset + SLOT_SIZE])
    }

    fn write_slot_at(&self, index: u32, slot: &Slot) {
        let offset = self.slot_offset(index);
        slot.encode_into(&mut self.bytes_mut()[offset..offset + SLOT_SIZE]);
    }

    /// Stages a torn-write recovery backup: on open, if `backup_index`
    /// names a slot whose `EDITING` bit is still set, restores it from
    /// the header backup range and clears the bit. If the process died
    /// between writing the backup and setting `EDITING`, the backup is
    /// stale and ignored (§9).
    fn recover(&self) {
        let backup_index = self.backup_index();
        if backup_index >= self.capacity() {
            return;
        }
        let mut slot = self.slot_at(backup_index);
        if !slot.is_editing() {
            return;
        }
        let backup_bytes = self.backup_slot_bytes();
        slot = Slot::decode(&backup_bytes);
        slot.flag = Slot::set_flag(slot.flag, FLAG_EDITING, false);
        self.write_slot_at(backup_index, &slot);
    }

    fn next_probe(&self, index: u32) -> u32 {
        let next = index + 1;
        if next == self.capacity() { 0 } else { next }
    }

    fn fetch_key(&self, key_storage: &BlobRegion, slot: &Slot) -> Vec<u8> {
        key_storage.get(slot.key_ptr, slot.key_len as usize)
    }

    /// Probes linearly from `hash(key)`, performing the consistent-read
    /// loop (§4.4.2/§5.3) once a matching live slot is found.
    pub fn read(&self, key_storage: &BlobRegion, value_storage: &BlobRegion, key: &[u8]) -> Option<Vec<u8>> {
        let capacity = self.capacity();
        let mut index = ByteBuffer::borrowed(key).hash(capacity);
        loop {
            let slot = self.slot_at(index);
            if !slot.is_set() {
                return None;
            }
            let candidate_key = self.fetch_key(key_storage, &slot);
            if candidate_key == key {
                return self.consistent_read(value_storage, index);
            }
            index = self.next_probe(index);
        }
    }

    fn consistent_read(&self, value_storage: &BlobRegion, index: u32) -> Option<Vec<u8>> {
        loop {
            let before = self.write_info.load();
            if before.writing && before.slot == index {
                std::thread::yield_now();
                continue;
            }

            let slot = self.slot_at(index);
            if slot.is_deleted() {
                return None;
            }

            let value = if slot.is_ref() {
                let value_ptr = u64::from_le_bytes(slot.value_data);
                value_storage.get(value_ptr, slot.value_len as usize)
            } else {
                slot.value_data[..slot.value_len as usize].to_vec()
            };

            let after = self.write_info.load();
            if after.version == before.version {
                return Some(value);
            }
            if after.version == before.version.wrapping_add(1) {
                if after.slot == index {
                    if after.writing {
                        std::thread::yield_now();
                        continue;
                    }
                    continue;
                }
                return Some(value);
            }
            // More than one version passed while reading; re-read from scratch.
        }
    }

    /// Inserts a new key or overwrites an existing one (§4.4.3).
    pub fn write(&self, key_storage: &BlobRegion, value_storage: &BlobRegion, key: &[u8], value: &[u8]) -> WriteOutcome {
        let capacity = self.capacity();
        let mut index = ByteBuffer::borrowed(key).hash(capacity);
        let is_update;
        loop {
            let mut slot = self.slot_at(index);
            if slot.is_set() {
                let candidate_key = self.fetch_key(key_storage, &slot);
                if candidate_key != key {
                    index = self.next_probe(index);
                    continue;
                }

                // Stage the backup before mutating the live slot in place.
                self.set_backup_index(index);
                let mut backup_bytes = [0u8; SLOT_SIZE];
                slot.encode_into(&mut backup_bytes);
                self.set_backup_slot_bytes(&backup_bytes);
                slot.flag = Slot::set_flag(slot.flag, FLAG_EDITING, true);
                self.write_slot_at(index, &slot);
                is_update = true;
            } else {
                let pos = self.key_pos();
                if key_storage.put(pos, key).is_err() {
                    return WriteOutcome::NeedGrowKey;
                }
                slot.key_len = key.len() as u8;
                slot.key_ptr = pos;
                self.write_slot_at(index, &slot);
                self.set_key_count(self.key_count() + 1);
                self.set_key_pos(pos + key.len() as u64);
                is_update = false;
            }
            break;
        }

        let last = self.write_info.load();
        self.write_info.store(WriteInfo {
            writing: true,
            version: last.version.wrapping_add(1),
            slot: index,
        });

        let mut slot = self.slot_at(index);
        slot.value_len = value.len() as u16;
        if value.len() <= MAX_INLINE_VALUE_LEN {
            let mut value_data = [0u8; 8];
            value_data[..value.len()].copy_from_slice(value);
            slot.value_data = value_data;
            self.write_slot_at(index, &slot);
        } else {
            let pos = self.value_pos();
            if value_storage.put(pos, value).is_err() {
                slot.flag = Slot::set_flag(slot.flag, FLAG_EDITING, false);
                self.write_slot_at(index, &slot);
                self.write_info.store(WriteInfo {
                    writing: false,
                    version: last.version.wrapping_add(1),
                    slot: index,
                });
                return WriteOutcome::NeedGrowValue;
            }
            slot.value_data = pos.to_le_bytes();
            self.write_slot_at(index, &slot);
            self.set_value_pos(pos + value.len() as u64);
        }

        if is_update {
            self.set_updated_count(self.updated_count() + 1);
        }

        let mut slot = self.slot_at(index);
        slot.flag = Slot::set_flag(slot.flag, FLAG_SET, true);
        slot.flag = Slot::set_flag(slot.flag, FLAG_DELETED, false);
        slot.flag = Slot::set_flag(slot.flag, FLAG_REF, value.len() > MAX_INLINE_VALUE_LEN);
        slot.flag = Slot::set_flag(slot.flag, FLAG_EDITING, false);
        self.write_slot_at(index, &slot);

        self.write_info.store(WriteInfo {
            writing: false,
            version: last.version.wrapping_add(1),
            slot: index,
        });

        WriteOutcome::Ok
    }

    /// Tombstones the slot holding `key`, if live. Never clears `SET` —
    /// chain integrity depends on it staying set (§4.4.4).
    pub fn del(&self, key_storage: &BlobRegion, key: &[u8]) {
        let capacity = self.capacity();
        let mut index = ByteBuffer::borrowed(key).hash(capacity);
        loop {
            let mut slot = self.slot_at(index);
            if !slot.is_set() {
                return;
            }
            let candidate_key = self.fetch_key(key_storage, &slot);
            if candidate_key != key {
                index = self.next_probe(index);
                continue;
            }
            if !slot.is_deleted() {
                slot.flag = Slot::set_flag(slot.flag, FLAG_DELETED, true);
                self.write_slot_at(index, &slot);
            }
            return;
        }
    }

    /// Rehashes every live, non-tombstoned slot of `from` into `self`
    /// (§4.4.5). `self` must have strictly more capacity than `from` has
    /// live keys — asserted, since a violation here is a caller bug
    /// (§9, resolving the source's unguarded assumption).
    pub fn copy_from(&self, key_storage: &BlobRegion, from: &Index) {
        assert!(
            self.capacity() > from.key_count(),
            "copy_from destination capacity ({}) must exceed source key_count ({})",
            self.capacity(),
            from.key_count()
        );

        self.set_updated_count(0);
        self.set_key_pos(from.key_pos());
        self.set_value_pos(from.value_pos());

        let mut key_count = 0u32;
        for i in 0..from.capacity() {
            let slot = from.slot_at(i);
            if !slot.is_set() || slot.is_deleted() {
                continue;
            }
            let key_bytes = from.fetch_key(key_storage, &slot);
            let mut target = ByteBuffer::borrowed(&key_bytes).hash(self.capacity());
            loop {
                if !self.slot_at(target).is_set() {
                    self.write_slot_at(target, &slot);
                    key_count += 1;
                    break;
                }
                target = self.next_probe(target);
            }
        }
        self.set_key_count(key_count);
    }

    /// Packs every live, referenced value from `from_values` into
    /// `to_values` starting at offset 0, rewriting each slot's value
    /// pointer in place (§4.4.6). Inline values and the key region are
    /// untouched.
    pub fn compact(&self, from_values: &BlobRegion, to_values: &BlobRegion) {
        let mut pos = 0u64;
        for i in 0..self.capacity() {
            let mut slot = self.slot_at(i);
            if !slot.is_set() || slot.is_deleted() || !slot.is_ref() {
                continue;
            }
            let value_ptr = u64::from_le_bytes(slot.value_data);
            let value_len = slot.value_len as usize;
            from_values.copy_to(to_values, value_ptr, pos, value_len);
            slot.value_data = pos.to_le_bytes();
            self.write_slot_at(i, &slot);
            pos += value_len as u64;
        }
        self.set_value_pos(pos);
    }

    pub fn write_info_version(&self) -> u32 {
        self.write_info.load().version
    }

    /// `Ordering::Acquire` semantics when polled from outside the write
    /// path (used by tests asserting no in-progress write is pending).
    pub fn is_writing(&self) -> bool {
        self.write_info.load().writing
    }
}
