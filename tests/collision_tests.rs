//! Tests for keys whose hashes collide.
//!
//! `BucketKey` hashes only its `bucket` field, so any two keys in one bucket
//! share a full 32-bit hash and end up in a collision node, while keys in
//! different buckets are spread across the trie as usual.

use leanmap::LeanMap;
use rstest::rstest;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq)]
struct BucketKey {
    bucket: u8,
    id: u32,
}

impl BucketKey {
    const fn new(bucket: u8, id: u32) -> Self {
        Self { bucket, id }
    }
}

impl Hash for BucketKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bucket.hash(state);
    }
}

fn colliding_map(count: u32) -> LeanMap<BucketKey, u32> {
    (0..count).map(|id| (BucketKey::new(0, id), id)).collect()
}

// =============================================================================
// Lookup
// =============================================================================

#[rstest]
#[case(2)]
#[case(3)]
#[case(50)]
fn test_all_colliding_keys_are_found(#[case] count: u32) {
    let map = colliding_map(count);
    assert_eq!(map.len(), count as usize);
    for id in 0..count {
        assert_eq!(map.get(&BucketKey::new(0, id)), Some(&id));
    }
    assert_eq!(map.get(&BucketKey::new(0, count)), None);
}

#[rstest]
fn test_colliding_and_distinct_keys_coexist() {
    let map: LeanMap<BucketKey, u32> = (0..20_u8)
        .flat_map(|bucket| (0..5).map(move |id| (BucketKey::new(bucket, id), u32::from(bucket) * 100 + id)))
        .collect();

    assert_eq!(map.len(), 100);
    assert_eq!(map.get(&BucketKey::new(7, 3)), Some(&703));
    assert_eq!(map.iter().count(), 100);
}

// =============================================================================
// Update and removal
// =============================================================================

#[rstest]
fn test_overwrite_inside_collision_node() {
    let map = colliding_map(3);
    let updated = map.insert(BucketKey::new(0, 1), 100);

    assert_eq!(updated.len(), 3);
    assert_eq!(updated.get(&BucketKey::new(0, 1)), Some(&100));
    assert_eq!(map.get(&BucketKey::new(0, 1)), Some(&1));
}

#[rstest]
fn test_remove_colliding_keys_one_by_one() {
    let mut map = colliding_map(4);
    for id in 0..4 {
        map = map.remove(&BucketKey::new(0, id));
        assert_eq!(map.len(), (3 - id) as usize);
        for remaining in (id + 1)..4 {
            assert_eq!(map.get(&BucketKey::new(0, remaining)), Some(&remaining));
        }
    }
    assert!(map.is_empty());
}

#[rstest]
fn test_remove_absent_colliding_key_shares_map() {
    let map = colliding_map(3);
    let unchanged = map.remove(&BucketKey::new(0, 99));
    assert!(unchanged.ptr_eq(&map));
}

#[rstest]
fn test_collapsed_collision_still_accepts_new_keys() {
    let map = colliding_map(2).remove(&BucketKey::new(0, 0));
    assert_eq!(map.len(), 1);

    let regrown = map
        .insert(BucketKey::new(0, 10), 10)
        .insert(BucketKey::new(1, 0), 0);
    assert_eq!(regrown.len(), 3);
    assert_eq!(regrown.get(&BucketKey::new(0, 1)), Some(&1));
    assert_eq!(regrown.get(&BucketKey::new(0, 10)), Some(&10));
}

#[rstest]
fn test_transient_handles_collisions() {
    let mut transient = colliding_map(10).transient();
    for id in 0..10 {
        if id % 2 == 0 {
            transient.remove(&BucketKey::new(0, id)).unwrap();
        }
    }
    transient.insert(BucketKey::new(0, 42), 42).unwrap();
    let map = transient.persistent().unwrap();

    assert_eq!(map.len(), 6);
    assert_eq!(map.get(&BucketKey::new(0, 3)), Some(&3));
    assert_eq!(map.get(&BucketKey::new(0, 4)), None);
    assert_eq!(map.get(&BucketKey::new(0, 42)), Some(&42));
}

#[rstest]
fn test_equality_with_collisions_ignores_order() {
    let forward = colliding_map(6);
    let backward: LeanMap<BucketKey, u32> = (0..6).rev().map(|id| (BucketKey::new(0, id), id)).collect();
    assert_eq!(forward, backward);
}
