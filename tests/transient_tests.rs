//! Tests for TransientLeanMap.
//!
//! Covers batch editing, isolation from the source map and the stale-handle
//! errors reported after finalize.

use leanmap::{LeanMap, LeanMapError, StaleTransientError, TransientLeanMap};
use rstest::rstest;

fn finalized() -> TransientLeanMap<String, i32> {
    let mut transient = TransientLeanMap::new();
    transient.insert("a".to_string(), 1).unwrap();
    transient.finalize().unwrap();
    transient
}

fn stale(operation: &'static str) -> LeanMapError {
    LeanMapError::StaleTransient(StaleTransientError { operation })
}

// =============================================================================
// Batch editing
// =============================================================================

#[rstest]
fn test_transient_builds_map() {
    let mut transient = TransientLeanMap::new();
    for key in 0..1_000 {
        assert_eq!(transient.insert(key, key), Ok(true));
    }
    let map = transient.persistent().unwrap();

    assert_eq!(map.len(), 1_000);
    assert_eq!(map.get(&999), Some(&999));
}

#[rstest]
fn test_transient_does_not_affect_source() {
    let source: LeanMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
    let mut transient = source.transient();
    for key in 0..100 {
        transient.insert(key, -key).unwrap();
    }
    transient.remove(&0).unwrap();
    transient.insert(500, 500).unwrap();
    let edited = transient.persistent().unwrap();

    assert_eq!(source.len(), 100);
    for key in 0..100 {
        assert_eq!(source.get(&key), Some(&key));
    }
    assert_eq!(edited.len(), 100);
    assert_eq!(edited.get(&0), None);
    assert_eq!(edited.get(&7), Some(&-7));
}

#[rstest]
fn test_two_transients_from_one_source_are_independent() {
    let source: LeanMap<i32, i32> = (0..64).map(|key| (key, key)).collect();
    let mut first = source.transient();
    let mut second = source.transient();

    first.insert(1, 100).unwrap();
    second.remove(&1).unwrap();

    let first = first.persistent().unwrap();
    let second = second.persistent().unwrap();
    assert_eq!(first.get(&1), Some(&100));
    assert_eq!(second.get(&1), None);
    assert_eq!(source.get(&1), Some(&1));
}

#[rstest]
fn test_published_map_is_frozen_against_new_transients() {
    let mut transient = TransientLeanMap::new();
    for key in 0..200 {
        transient.insert(key, key).unwrap();
    }
    let published = transient.persistent().unwrap();

    let mut next = published.transient();
    for key in 0..200 {
        next.insert(key, 0).unwrap();
    }
    let zeroed = next.persistent().unwrap();

    assert_eq!(published.get(&150), Some(&150));
    assert_eq!(zeroed.get(&150), Some(&0));
}

#[rstest]
fn test_transient_extend_and_queries() {
    let mut transient = TransientLeanMap::new();
    transient.extend([("a", 1), ("b", 2)]).unwrap();

    assert_eq!(transient.len(), Ok(2));
    assert_eq!(transient.is_empty(), Ok(false));
    assert_eq!(transient.contains_key("a"), Ok(true));
    assert_eq!(transient.get("b"), Ok(Some(&2)));
    assert_eq!(transient.get("c"), Ok(None));
}

#[rstest]
fn test_transient_try_insert_leaves_batch_usable() {
    let mut transient = TransientLeanMap::new();
    transient.insert("a", 1).unwrap();
    assert!(matches!(
        transient.try_insert("a", 2),
        Err(LeanMapError::DuplicateKey(_))
    ));
    transient.insert("b", 2).unwrap();
    let map = transient.persistent().unwrap();

    assert_eq!(map.get("a"), Some(&1));
    assert_eq!(map.len(), 2);
}

#[rstest]
fn test_transient_remove_all_then_reinsert() {
    let mut transient = LeanMap::from_flat([1, 1, 2, 2]).unwrap().transient();
    transient.remove(&1).unwrap();
    transient.remove(&2).unwrap();
    assert_eq!(transient.is_empty(), Ok(true));

    transient.insert(3, 3).unwrap();
    let map = transient.persistent().unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&3), Some(&3));
}

// =============================================================================
// Stale handle
// =============================================================================

#[rstest]
fn test_stale_insert() {
    let mut transient = finalized();
    assert_eq!(
        transient.insert("b".to_string(), 2),
        Err(stale("TransientLeanMap::insert"))
    );
}

#[rstest]
fn test_stale_try_insert() {
    let mut transient = finalized();
    assert_eq!(
        transient.try_insert("b".to_string(), 2),
        Err(stale("TransientLeanMap::try_insert"))
    );
}

#[rstest]
fn test_stale_remove() {
    let mut transient = finalized();
    assert_eq!(transient.remove("a"), Err(stale("TransientLeanMap::remove")));
}

#[rstest]
fn test_stale_get() {
    let transient = finalized();
    assert_eq!(transient.get("a"), Err(stale("TransientLeanMap::get")));
}

#[rstest]
fn test_stale_contains_key() {
    let transient = finalized();
    assert_eq!(
        transient.contains_key("a"),
        Err(stale("TransientLeanMap::contains_key"))
    );
}

#[rstest]
fn test_stale_len_and_is_empty() {
    let transient = finalized();
    assert_eq!(transient.len(), Err(stale("TransientLeanMap::len")));
    assert_eq!(transient.is_empty(), Err(stale("TransientLeanMap::is_empty")));
}

#[rstest]
fn test_stale_extend() {
    let mut transient = finalized();
    assert_eq!(
        transient.extend([("b".to_string(), 2)]),
        Err(stale("TransientLeanMap::extend"))
    );
}

#[rstest]
fn test_stale_finalize_and_persistent() {
    let mut transient = finalized();
    assert_eq!(
        transient.finalize().unwrap_err(),
        stale("TransientLeanMap::finalize")
    );
    assert_eq!(
        transient.persistent().unwrap_err(),
        stale("TransientLeanMap::finalize")
    );
}

#[rstest]
fn test_stale_error_message() {
    let transient = finalized();
    let error = transient.len().unwrap_err();
    assert_eq!(
        error.to_string(),
        "TransientLeanMap::len: transient used after finalize"
    );
}

#[rstest]
fn test_finalized_map_survives_stale_attempts() {
    let mut transient = TransientLeanMap::new();
    transient.insert(1, 1).unwrap();
    let map = transient.finalize().unwrap();

    let _ = transient.insert(2, 2);
    let _ = transient.remove(&1);

    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&1), Some(&1));
    assert_eq!(map.get(&2), None);
}
