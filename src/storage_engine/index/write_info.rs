use std::sync::atomic::{AtomicU64, Ordering};

/// The `(writing, version, slot)` triple readers and the single writer use
/// to coordinate a lock-free read against an in-progress single-slot
/// update.
///
/// Packed into one `u64` (1 bit writing, 31 bits version, 32 bits slot)
/// so the whole triple is one atomic load/store — the whole point of the
/// packing is that there is no way to observe "half" of it (§5.3, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteInfo {
    pub writing: bool,
    pub version: u32,
    pub slot: u32,
}

const VERSION_MASK: u64 = 0x7FFF_FFFF;
const WRITING_BIT: u64 = 1 << 63;

impl WriteInfo {
    pub const INITIAL: WriteInfo = WriteInfo {
        writing: false,
        version: 0,
        slot: 0,
    };

    fn pack(self) -> u64 {
        let writing_bit = if self.writing { WRITING_BIT } else { 0 };
        let version_bits = ((self.version as u64) & VERSION_MASK) << 32;
        writing_bit | version_bits | self.slot as u64
    }

    fn unpack(word: u64) -> WriteInfo {
        WriteInfo {
            writing: word & WRITING_BIT != 0,
            version: ((word >> 32) & VERSION_MASK) as u32,
            slot: word as u32,
        }
    }
}

/// An `AtomicU64` viewed through the `WriteInfo` packing.
pub struct AtomicWriteInfo(AtomicU64);

impl AtomicWriteInfo {
    pub fn new(initial: WriteInfo) -> Self {
        Self(AtomicU64::new(initial.pack()))
    }

    pub fn load(&self) -> WriteInfo {
        WriteInfo::unpack(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, info: WriteInfo) {
        self.0.store(info.pack(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_the_packed_word() {
        let info = WriteInfo {
            writing: true,
            version: 0x7FFF_FFFE,
            slot: 0xABCD_1234,
        };
        assert_eq!(WriteInfo::unpack(info.pack()), info);
    }

    #[test]
    fn atomic_load_store_roundtrips() {
        let atomic = AtomicWriteInfo::new(WriteInfo::INITIAL);
        let info = WriteInfo {
            writing: true,
            version: 7,
            slot: 42,
        };
        atomic.store(info);
        assert_eq!(atomic.load(), info);
    }

    #[test]
    fn version_is_bounded_to_31_bits() {
        let info = WriteInfo {
            writing: false,
            version: u32::MAX,
            slot: 0,
        };
        assert_eq!(WriteInfo::unpack(info.pack()).version, u32::MAX & (VERSION_MASK as u32));
    }
}
