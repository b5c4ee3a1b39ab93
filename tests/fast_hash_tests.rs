//! Tests for the hash function feature flags.
//!
//! Whichever of the default, `fxhash` or `ahash` hashers is compiled in, the
//! same key must always land in the same place, so identical inputs give
//! identical maps.

use leanmap::LeanMap;
use rstest::rstest;

// =============================================================================
// Determinism
// =============================================================================

#[rstest]
fn test_same_key_produces_same_hash() {
    let map1 = LeanMap::new().insert("key".to_string(), 1);
    let map2 = LeanMap::new().insert("key".to_string(), 2);

    assert_eq!(map1.get("key"), Some(&1));
    assert_eq!(map2.get("key"), Some(&2));

    let map3: LeanMap<i32, i32> = LeanMap::new().insert(42, 100);
    let map4: LeanMap<i32, i32> = LeanMap::new().insert(42, 200);

    assert_eq!(map3.get(&42), Some(&100));
    assert_eq!(map4.get(&42), Some(&200));
}

/// Maps built from the same entries in the same order visit them in the same
/// order.
#[rstest]
fn test_deterministic_iteration_order() {
    let entries: Vec<(String, i32)> = vec![
        ("alpha".to_string(), 1),
        ("beta".to_string(), 2),
        ("gamma".to_string(), 3),
        ("delta".to_string(), 4),
    ];

    let map1: LeanMap<String, i32> = entries.iter().cloned().collect();
    let map2: LeanMap<String, i32> = entries.iter().cloned().collect();

    let order1: Vec<_> = map1.keys().cloned().collect();
    let order2: Vec<_> = map2.keys().cloned().collect();
    assert_eq!(order1, order2);
}

#[rstest]
fn test_insertion_order_does_not_change_layout() {
    let forward: LeanMap<i32, i32> = (0..500).map(|key| (key, key)).collect();
    let backward: LeanMap<i32, i32> = (0..500).rev().map(|key| (key, key)).collect();

    let forward_order: Vec<_> = forward.keys().copied().collect();
    let backward_order: Vec<_> = backward.keys().copied().collect();
    assert_eq!(forward_order, backward_order);
}

// =============================================================================
// Large scale
// =============================================================================

#[rstest]
#[case(1_000)]
#[case(10_000)]
fn test_large_scale_string_keys(#[case] count: usize) {
    let map: LeanMap<String, usize> = (0..count).map(|index| (format!("key_{index}"), index)).collect();

    assert_eq!(map.len(), count);
    for index in 0..count {
        assert_eq!(map.get(&format!("key_{index}")), Some(&index));
    }
}

#[rstest]
fn test_large_scale_integer_keys_with_removal() {
    let map: LeanMap<i64, i64> = (0..10_000).map(|key| (key, -key)).collect();
    let halved = (0..10_000).step_by(2).fold(map, |map, key| map.remove(&key));

    assert_eq!(halved.len(), 5_000);
    assert_eq!(halved.get(&1), Some(&-1));
    assert_eq!(halved.get(&2), None);
}
