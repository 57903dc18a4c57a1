#![cfg(not(loom))]

use core::sync::atomic::Ordering;

use proptest::prelude::*;
use xact::{AtomicWord, FixedAtomicWordGroup};

#[derive(Debug, Clone)]
enum Operation {
    Cas {
        hit: bool,
        expected: [u64; 3],
        desired: [u64; 3],
    },
    Load,
    Bump(usize, u64),
}

fn values() -> impl Strategy<Value = [u64; 3]> {
    prop::array::uniform3(0u64..8)
}

proptest! {
    #[test]
    fn test_group_matches_plain_array(ops in proptest::collection::vec(
        prop_oneof![
            (any::<bool>(), values(), values())
                .prop_map(|(hit, expected, desired)| Operation::Cas { hit, expected, desired }),
            Just(Operation::Load),
            (0usize..3, 0u64..4).prop_map(|(i, d)| Operation::Bump(i, d)),
        ],
        1..100
    )) {
        let mut model = [0u64; 3];
        let words: [AtomicWord; 3] = Default::default();
        let group = FixedAtomicWordGroup::<3>::from_slice(&words);

        for op in ops {
            match op {
                Operation::Cas { hit, expected, desired } => {
                    let expected = if hit { model } else { expected };
                    let should_swap = expected == model;
                    let swapped = group.compare_exchange(&expected, &desired);
                    prop_assert_eq!(swapped, should_swap, "CAS outcome mismatch for {:?}", expected);
                    if swapped {
                        model = desired;
                    }
                }
                Operation::Load => {
                    prop_assert_eq!(group.snapshot(), Some(model));
                }
                Operation::Bump(i, d) => {
                    let prev = words[i].fetch_add(d, Ordering::SeqCst);
                    prop_assert_eq!(prev, model[i]);
                    model[i] += d;
                }
            }
        }

        // Final consistency check
        for (word, &v) in words.iter().zip(&model) {
            prop_assert_eq!(word.load(Ordering::SeqCst), v, "leftover tag or stale value");
        }
    }
}
