//! Byte-layout constants for the index file (see `storage_engine::index`).

/// Fixed header size at the start of every index file.
pub const INDEX_HEADER_LEN: usize = 64;

/// Size of one slot: flag(1) + key_len(1) + key_ptr(8) + value_len(2) + value_data(8).
pub const SLOT_SIZE: usize = 1 + 1 + 8 + 2 + 8;

pub const KEY_COUNT_RANGE: std::ops::Range<usize> = 0..4;
pub const UPDATED_COUNT_RANGE: std::ops::Range<usize> = 4..8;
pub const KEY_POS_RANGE: std::ops::Range<usize> = 8..16;
pub const VALUE_POS_RANGE: std::ops::Range<usize> = 16..24;

/// `64 - SLOT_SIZE - 4`, derived rather than hardcoded so the header stays
/// consistent if `SLOT_SIZE` ever changes.
pub const BACKUP_SLOT_OFFSET: usize = INDEX_HEADER_LEN - SLOT_SIZE - 4;
pub const BACKUP_SLOT_RANGE: std::ops::Range<usize> =
    BACKUP_SLOT_OFFSET..BACKUP_SLOT_OFFSET + SLOT_SIZE;
pub const BACKUP_INDEX_RANGE: std::ops::Range<usize> = INDEX_HEADER_LEN - 4..INDEX_HEADER_LEN;

// Slot field offsets, relative to the start of a slot.
pub const SLOT_FLAG_OFFSET: usize = 0;
pub const SLOT_KEY_LEN_OFFSET: usize = 1;
pub const SLOT_KEY_PTR_RANGE: std::ops::Range<usize> = 2..10;
pub const SLOT_VALUE_LEN_RANGE: std::ops::Range<usize> = 10..12;
pub const SLOT_VALUE_DATA_RANGE: std::ops::Range<usize> = 12..20;

/// Values of this length or smaller are stored inline in `value_data`
/// rather than appended to the value blob region.
pub const MAX_INLINE_VALUE_LEN: usize = 8;

pub const FLAG_SET: u8 = 0x1;
pub const FLAG_REF: u8 = 0x2;
pub const FLAG_EDITING: u8 = 0x4;
pub const FLAG_DELETED: u8 = 0x8;

pub const MIN_KEY_LEN: usize = 1;
pub const MAX_KEY_LEN: usize = 255;
pub const MAX_VALUE_LEN: usize = 65_535;
