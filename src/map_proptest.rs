#![cfg(test)]

// Property tests for Map kept inside the crate so they can call the
// structural validator after every step.

use crate::heap::HeapAllocator;
use crate::map::Map;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
enum Op {
    Set(u16, i32),
    Remove(u16),
    Find(u16),
    Bump(u16, i32),
    Clear,
    Iterate,
}

// Keys are drawn from a small range so sets and removes keep colliding.
fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let key = 0u16..64;
    let op = prop_oneof![
        6 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
        4 => key.clone().prop_map(Op::Remove),
        2 => key.clone().prop_map(Op::Find),
        1 => (key, any::<i32>()).prop_map(|(k, d)| Op::Bump(k, d)),
        1 => Just(Op::Clear),
        1 => Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..200)
}

// Property: state-machine equivalence against std::collections::BTreeMap.
// - `set` returns the replaced value exactly when the model had the key.
// - `remove` returns the model's value and absent removals change nothing.
// - Every red-black property holds after every operation.
// - Iteration yields each live pair exactly once.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_matches_btreemap(ops in arb_ops()) {
        let heap = HeapAllocator::new();
        let mut sut: Map<u16, i32> = Map::new(&heap);
        let mut model: BTreeMap<u16, i32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Set(k, v) => {
                    prop_assert_eq!(sut.set(k, v), model.insert(k, v));
                }
                Op::Remove(k) => {
                    prop_assert_eq!(sut.remove(&k), model.remove(&k));
                }
                Op::Find(k) => {
                    prop_assert_eq!(sut.find(&k), model.get(&k));
                    prop_assert_eq!(sut.has(&k), model.contains_key(&k));
                    prop_assert_eq!(*sut.get(&k, &i32::MIN), model.get(&k).copied().unwrap_or(i32::MIN));
                }
                Op::Bump(k, d) => {
                    if let Some(v) = sut.find_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
                Op::Iterate => {
                    let pairs: BTreeSet<(u16, i32)> = sut.iter().map(|e| (e.key, e.value)).collect();
                    prop_assert_eq!(pairs.len(), sut.len());
                    let expected: BTreeSet<(u16, i32)> = model.iter().map(|(&k, &v)| (k, v)).collect();
                    prop_assert_eq!(pairs, expected);
                }
            }

            if let Err(e) = sut.validate() {
                prop_assert!(false, "invariant broken: {}", e);
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
        }
    }
}
