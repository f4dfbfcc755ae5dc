#[cfg(test)]
mod tests {
    use latch_drive::{Engine, EngineConfig};
    use tempfile::tempdir;

    fn open_engine() -> (tempfile::TempDir, Engine) {
        let dir = tempdir().expect("failed to create temp dir");
        let engine = Engine::open(dir.path(), EngineConfig::default()).expect("failed to open engine");
        (dir, engine)
    }

    #[test]
    fn put_then_get_returns_the_stored_value() {
        let (_dir, engine) = open_engine();
        engine.put(b"hi", b"world").expect("put failed");
        assert_eq!(engine.get(b"hi").unwrap(), Some(b"world".to_vec()));
    }

    #[test]
    fn overwriting_a_key_returns_the_latest_value() {
        let (_dir, engine) = open_engine();
        engine.put(b"a", b"first").unwrap();
        engine.put(b"a", b"second").unwrap();
        assert_eq!(engine.get(b"a").unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn missing_key_reads_as_none() {
        let (_dir, engine) = open_engine();
        assert_eq!(engine.get(b"nope").unwrap(), None);
    }

    #[test]
    fn delete_then_get_is_absent_and_idempotent() {
        let (_dir, engine) = open_engine();
        engine.put(b"k", b"v").unwrap();
        engine.del(b"k").unwrap();
        assert_eq!(engine.get(b"k").unwrap(), None);

        let stats_after_first_delete = engine.stats();
        engine.del(b"k").unwrap();
        assert_eq!(engine.stats().key_count, stats_after_first_delete.key_count);
    }

    #[test]
    fn inline_vs_ref_boundary_is_eight_bytes() {
        let (_dir, engine) = open_engine();
        engine.put(b"a", b"01234567").unwrap(); // 8 bytes: inline
        assert_eq!(engine.stats().value_pos, 0);
        engine.put(b"a", b"012345678").unwrap(); // 9 bytes: REF
        assert_eq!(engine.stats().value_pos, 9);
        assert_eq!(engine.get(b"a").unwrap(), Some(b"012345678".to_vec()));
    }

    #[test]
    fn rejects_keys_and_values_outside_the_allowed_sizes() {
        let (_dir, engine) = open_engine();
        assert!(engine.put(b"", b"v").is_err());
        assert!(engine.put(&vec![0u8; 256], b"v").is_err());
        assert!(engine.put(b"k", &vec![0u8; 65_536]).is_err());
        assert!(engine.get(b"").is_err());
    }

    #[test]
    fn many_distinct_keys_all_round_trip() {
        let (_dir, engine) = open_engine();
        for i in 0u32..500 {
            engine.put(&i.to_le_bytes(), format!("value-{i}").as_bytes()).unwrap();
        }
        for i in 0u32..500 {
            assert_eq!(
                engine.get(&i.to_le_bytes()).unwrap(),
                Some(format!("value-{i}").into_bytes())
            );
        }
    }
}
