//! Property tests for heap pool invariants

use nodeheap::error::Error;
use nodeheap::HeapPool;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..64)
}

proptest! {
    #[test]
    fn prop_set_then_get_returns_same_bytes(node in 0i32..32, data in payload()) {
        let mut pool = HeapPool::with_capacity(1).unwrap();
        let heap = pool.create_heap(32).unwrap();

        pool.set_data(heap, node, data.clone()).unwrap();
        let view = pool.get_data(heap, node).unwrap();
        prop_assert_eq!(view.length(), data.len());
        prop_assert_eq!(view.bytes(), data.as_slice());
    }

    #[test]
    fn prop_second_write_leaves_original(node in 0i32..16, first in payload(), second in payload()) {
        let mut pool = HeapPool::with_capacity(1).unwrap();
        let heap = pool.create_heap(16).unwrap();
        pool.set_data(heap, node, first.clone()).unwrap();

        let rejected = pool.set_data(heap, node, second.clone()).unwrap_err();
        prop_assert_eq!(&rejected.error, &Error::NodeAlreadyPopulated { heap, node });
        prop_assert_eq!(rejected.into_bytes().to_vec(), second);
        prop_assert_eq!(pool.get_data(heap, node).unwrap().bytes(), first.as_slice());
    }

    #[test]
    fn prop_destroy_then_rewrite(node in 0i32..16, first in payload(), second in payload()) {
        let mut pool = HeapPool::with_capacity(1).unwrap();
        let heap = pool.create_heap(16).unwrap();
        pool.set_data(heap, node, first).unwrap();

        prop_assert_eq!(pool.destroy_node(heap, node), Ok(true));
        pool.set_data(heap, node, second.clone()).unwrap();
        let view = pool.get_data(heap, node).unwrap();
        prop_assert_eq!(view.length(), second.len());
        prop_assert_eq!(view.bytes(), second.as_slice());
    }

    #[test]
    fn prop_destroy_range_clears_exactly_range(
        written in prop::collection::btree_set(0i32..40, 0..20),
        start in 0i32..40,
        len in 0i32..40,
    ) {
        let end = start + len;
        let mut pool = HeapPool::with_capacity(1).unwrap();
        let heap = pool.create_heap(40).unwrap();
        for &node in &written {
            pool.set_data(heap, node, vec![node as u8 + 1]).unwrap();
        }

        let expected = written.iter().filter(|&&n| n >= start && n <= end).count();
        prop_assert_eq!(pool.destroy_nodes(heap, start, end), Ok(expected));

        for node in 0..40 {
            let result = pool.get_data(heap, node);
            if node >= start && node <= end {
                prop_assert_eq!(result.unwrap_err(), Error::NodeNotFound { heap, node });
            } else if written.contains(&node) {
                prop_assert_eq!(result.unwrap().bytes(), &[node as u8 + 1][..]);
            } else {
                prop_assert!(result.is_err());
            }
        }
    }

    #[test]
    fn prop_live_handles_are_unique(ops in prop::collection::vec(any::<bool>(), 1..100)) {
        let mut pool = HeapPool::with_capacity(8).unwrap();
        let mut live: BTreeMap<i32, ()> = BTreeMap::new();

        for create in ops {
            if create {
                match pool.create_heap(2) {
                    Ok(heap) => prop_assert!(live.insert(heap, ()).is_none()),
                    Err(e) => {
                        prop_assert_eq!(e, Error::HandlesExhausted);
                        prop_assert_eq!(live.len(), 8);
                    }
                }
            } else if let Some((&heap, _)) = live.iter().next() {
                pool.destroy_heap(heap).unwrap();
                live.remove(&heap);
            }
            prop_assert_eq!(pool.stats().live_heaps, live.len());
            prop_assert_eq!(pool.stats().free_handles, 8 - live.len());
        }
    }
}
