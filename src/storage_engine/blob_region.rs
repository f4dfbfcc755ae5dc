use super::simd_copy::simd_copy;
use crate::utils::map_file;
use memmap2::MmapMut;
use std::cell::UnsafeCell;
use std::io;
use std::path::Path;

/// Signals that a `put` would write past the end of the region. The caller
/// (the index, ultimately the engine) is responsible for growing the
/// region and retrying; this type carries no data because there's nothing
/// to add to "not enough room."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfSpace;

/// A contiguous, mmap'd byte arena: `get(offset, len)` for random reads
/// and bounded `put(offset, data)` append/overwrite.
///
/// The engine serializes all writers through its own writer mutex but
/// lets readers run lock-free against the same mapping (§5 of the
/// storage engine design), so this type hands out interior mutability
/// through `&self` rather than `&mut self` — the same shape the on-disk
/// index uses for the same reason. Callers outside the index/engine
/// pairing never get a `BlobRegion` handle without going through that
/// coordination.
pub struct BlobRegion {
    mmap: UnsafeCell<MmapMut>,
    size: u64,
}

// SAFETY: all concurrent access to the underlying bytes is coordinated by
// the index's `WriteInfo` protocol and the engine's writer mutex /
// reader-counter gate; `BlobRegion` itself only provides the raw
// operations those protocols are built from.
unsafe impl Sync for BlobRegion {}
unsafe impl Send for BlobRegion {}

impl BlobRegion {
    pub fn open(path: &Path, min_size: u64) -> io::Result<Self> {
        let mmap = map_file(path, min_size)?;
        let size = mmap.len() as u64;
        Ok(Self {
            mmap: UnsafeCell::new(mmap),
            size,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    #[allow(clippy::mut_from_ref)]
    fn bytes_mut(&self) -> &mut [u8] {
        // SAFETY: see the `Sync`/`Send` impls above.
        unsafe { (*self.mmap.get()).as_mut() }
    }

    /// Always returns a freshly owned copy, detaching the caller from the
    /// mapping's lifetime — required because the engine may swap this
    /// region out from under concurrent readers (§4.2).
    pub fn get(&self, offset: u64, len: usize) -> Vec<u8> {
        let start = offset as usize;
        self.bytes_mut()[start..start + len].to_vec()
    }

    /// Writes `data` at `offset`. Fails with `OutOfSpace` iff
    /// `offset + data.len() > size`; never grows the mapping itself.
    pub fn put(&self, offset: u64, data: &[u8]) -> Result<(), OutOfSpace> {
        if offset + data.len() as u64 > self.size {
            return Err(OutOfSpace);
        }
        let start = offset as usize;
        let end = start + data.len();
        simd_copy(&mut self.bytes_mut()[start..end], data);
        Ok(())
    }

    /// Raw copy from `self` at `src_offset` into `dst` at `dst_offset`,
    /// `len` bytes. Performs no bounds validation: compaction, the only
    /// caller, controls both ends (§4.2).
    pub fn copy_to(&self, dst: &BlobRegion, src_offset: u64, dst_offset: u64, len: usize) {
        let src_start = src_offset as usize;
        let dst_start = dst_offset as usize;
        let src = &self.bytes_mut()[src_start..src_start + len];
        let dst = &mut dst.bytes_mut()[dst_start..dst_start + len];
        simd_copy(dst, src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempdir().unwrap();
        let region = BlobRegion::open(&dir.path().join("key_0"), 64).unwrap();
        region.put(0, b"hello").unwrap();
        assert_eq!(region.get(0, 5), b"hello");
    }

    #[test]
    fn put_out_of_space_fails() {
        let dir = tempdir().unwrap();
        let region = BlobRegion::open(&dir.path().join("key_0"), 8).unwrap();
        assert_eq!(region.put(4, b"01234567"), Err(OutOfSpace));
    }

    #[test]
    fn copy_to_moves_bytes_between_regions() {
        let dir = tempdir().unwrap();
        let src = BlobRegion::open(&dir.path().join("value_0"), 64).unwrap();
        let dst = BlobRegion::open(&dir.path().join("value_1"), 64).unwrap();
        src.put(0, b"payload!").unwrap();
        src.copy_to(&dst, 0, 10, 8);
        assert_eq!(dst.get(10, 8), b"payload!");
    }
}
