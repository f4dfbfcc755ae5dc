#[cfg(test)]
mod tests {
    use latch_drive::{Engine, EngineConfig};
    use tempfile::tempdir;

    #[test]
    fn data_survives_closing_and_reopening_the_same_directory() {
        let dir = tempdir().expect("failed to create temp dir");
        {
            let engine = Engine::open(dir.path(), EngineConfig::default()).unwrap();
            engine.put(b"hi", b"world").unwrap();
            assert_eq!(engine.get(b"hi").unwrap(), Some(b"world".to_vec()));
        } // Engine dropped here: posts MSG_EXIT and joins the maintenance thread.

        let engine = Engine::open(dir.path(), EngineConfig::default()).unwrap();
        assert_eq!(engine.get(b"hi").unwrap(), Some(b"world".to_vec()));
    }

    #[test]
    fn meta_file_and_generation_zero_files_exist_after_first_open() {
        let dir = tempdir().unwrap();
        let _engine = Engine::open(dir.path(), EngineConfig::default()).unwrap();
        assert!(dir.path().join("meta").exists());
        assert!(dir.path().join("index_0").exists());
        assert!(dir.path().join("key_0").exists());
        assert!(dir.path().join("value_0").exists());
    }

    #[test]
    fn reopening_an_empty_directory_creates_fresh_generation_zero_files() {
        let dir = tempdir().unwrap();
        let engine = Engine::open(dir.path(), EngineConfig::default()).unwrap();
        assert_eq!(engine.get(b"anything").unwrap(), None);
    }
}
