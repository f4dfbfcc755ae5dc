#[cfg(test)]
mod tests {
    use latch_drive::{Engine, EngineConfig};
    use rand::prelude::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// Drives the engine through a randomized sequence of put/delete/get
    /// operations against a plain `HashMap` oracle and checks every read
    /// agrees with the model, across an index small enough to force
    /// several growths along the way.
    #[test]
    fn random_put_delete_get_sequence_matches_a_hashmap_oracle() {
        let dir = tempdir().unwrap();
        let config = EngineConfig {
            index_init_bytes: 64 + 8 * 20,
            key_init_bytes: 1 << 16,
            value_init_bytes: 1 << 16,
            hash_factor: 0.75,
            autocompact_threshold: 64,
        };
        let engine = Engine::open(dir.path(), config).unwrap();

        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let mut oracle: HashMap<u16, Vec<u8>> = HashMap::new();

        for _ in 0..5_000 {
            let key_id: u16 = rng.random_range(0..200);
            let key = key_id.to_le_bytes();

            match rng.random_range(0..10) {
                0..=1 => {
                    oracle.remove(&key_id);
                    engine.del(&key).unwrap();
                }
                _ => {
                    let len = rng.random_range(0..40);
                    let value: Vec<u8> = (0..len).map(|_| rng.random::<u8>()).collect();
                    engine.put(&key, &value).unwrap();
                    oracle.insert(key_id, value);
                }
            }
        }

        for key_id in 0u16..200 {
            let key = key_id.to_le_bytes();
            assert_eq!(engine.get(&key).unwrap(), oracle.get(&key_id).cloned());
        }
    }
}
