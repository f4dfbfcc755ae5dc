use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Opens (creating if necessary) the file at `path`, grows it to at least
/// `min_size` bytes, and maps it read-write.
///
/// This is the `map(path, min_size) -> (base, size)` primitive the
/// reference implementation treats as an external dependency (backed
/// there by `open`/`ftruncate`/`mmap`). There is no host to supply it in
/// this crate, so it is implemented directly on top of `memmap2`.
pub fn map_file(path: &Path, min_size: u64) -> io::Result<MmapMut> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let current_len = file.metadata()?.len();
    if current_len < min_size {
        file.set_len(min_size)?;
    }

    // SAFETY: the file is exclusively owned by this process for the
    // lifetime of the mapping; concurrent external mutation of the
    // underlying file is outside this engine's contract (§1, non-goals).
    unsafe { MmapMut::map_mut(&file) }
}

#[cfg(test)]
mod tests {
    use super::map_file;
    use tempfile::tempdir;

    #[test]
    fn creates_and_grows_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("region_0");
        let mmap = map_file(&path, 4096).unwrap();
        assert_eq!(mmap.len(), 4096);
        assert_eq!(path.metadata().unwrap().len(), 4096);
    }

    #[test]
    fn reopen_preserves_larger_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("region_0");
        {
            let _mmap = map_file(&path, 8192).unwrap();
        }
        let mmap = map_file(&path, 4096).unwrap();
        assert_eq!(mmap.len(), 8192);
    }
}
