#![cfg(not(loom))]
use std::ptr::NonNull;

use object_pool::ObjectPool;
use proptest::prelude::*;
use proptest::proptest;

#[derive(Debug, Clone)]
enum Op {
    Allocate,
    /// Release the nth live slot, modulo how many are live.
    Release(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Allocate), any::<usize>().prop_map(Op::Release)]
}

proptest! {
    #![proptest_config(ProptestConfig{cases:500, ..Default::default()})]
    #[test]
    fn matches_first_fit_model(
        cap in 0usize..150,
        ops in prop::collection::vec(op(), 0..400),
    ) {
        let pool = ObjectPool::<u32>::new(cap).unwrap();
        let mut model = vec![false; cap];
        let mut live: Vec<NonNull<u32>> = vec![];

        for o in ops {
            match o {
                Op::Allocate => {
                    let expected = model.iter().position(|used| !used);
                    let got = pool.allocate();
                    prop_assert_eq!(got.map(|p| pool.slot_index(p).unwrap()), expected);
                    if let (Some(p), Some(i)) = (got, expected) {
                        model[i] = true;
                        live.push(p);
                    }
                }
                Op::Release(n) => {
                    if live.is_empty() {
                        continue;
                    }
                    let p = live.swap_remove(n % live.len());
                    model[pool.slot_index(p).unwrap()] = false;
                    unsafe { pool.release(p) };
                }
            }

            let used = model.iter().filter(|u| **u).count();
            prop_assert_eq!(pool.size(), used);
            prop_assert_eq!(pool.free_slots(), cap - used);
        }
    }
}
