use engine_substrate::{Hash, HeapAllocator};
use proptest::prelude::*;
use std::collections::HashMap;

// Model Hash against std HashMap for the unique-key operations, and against a
// per-key counter for the multi-value ones. Keys are drawn from a small range
// with a shared stride so chains collide after every rehash.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_hash_matches_hashmap(ops in proptest::collection::vec((0u8..=4u8, 0u64..24, any::<i32>()), 1..300)) {
        let heap = HeapAllocator::new();
        let mut h: Hash<i32> = Hash::new(&heap);
        let mut model: HashMap<u64, i32> = HashMap::new();

        for (op, raw_k, v) in ops {
            let key = raw_k * 16 + 1;
            match op {
                0 | 1 => {
                    h.set(key, v);
                    model.insert(key, v);
                }
                2 => {
                    prop_assert_eq!(h.remove(key), model.remove(&key));
                }
                3 => {
                    prop_assert_eq!(h.get(key, i32::MIN), model.get(&key).copied().unwrap_or(i32::MIN));
                }
                4 => {
                    let mut entries: Vec<(u64, i32)> = h.iter().map(|(k, &v)| (k, v)).collect();
                    entries.sort_unstable();
                    let mut expected: Vec<(u64, i32)> = model.iter().map(|(&k, &v)| (k, v)).collect();
                    expected.sort_unstable();
                    prop_assert_eq!(entries, expected);
                }
                _ => unreachable!(),
            }

            prop_assert_eq!(h.len(), model.len());
            prop_assert_eq!(h.has(key), model.contains_key(&key));
            if !h.is_empty() {
                prop_assert!((h.len() as f32) < h.bucket_count() as f32 * 0.7 + 1.0);
            }
        }
    }

    #[test]
    fn prop_multi_hash_counts(ops in proptest::collection::vec((any::<bool>(), 0u64..8, any::<u16>()), 1..200)) {
        let heap = HeapAllocator::new();
        let mut h: Hash<u16> = Hash::new(&heap);
        let mut model: HashMap<u64, Vec<u16>> = HashMap::new();

        for (insert, key, v) in ops {
            if insert {
                h.multi_insert(key, v);
                model.entry(key).or_default().push(v);
            } else {
                h.remove_all(key);
                model.remove(&key);
            }

            for k in 0..8u64 {
                let mut got: Vec<u16> = h.multi_iter(k).copied().collect();
                got.sort_unstable();
                let mut want = model.get(&k).cloned().unwrap_or_default();
                want.sort_unstable();
                prop_assert_eq!(got, want);
            }
        }
    }
}
