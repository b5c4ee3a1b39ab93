//! Key hashing and 5-bit hash slicing.
//!
//! Every key is reduced to a 32-bit hash. The trie consumes that hash five
//! bits at a time: the slice at `shift` selects one of 32 branch positions.
//! Seven slices (shifts 0, 5, ..., 30) cover all 32 bits; below that, keys
//! whose hashes are fully equal go into a collision node.
//!
//! The hasher is chosen at compile time:
//! - `fxhash` feature: `rustc_hash::FxHasher`
//! - `ahash` feature: `ahash` with fixed seeds
//! - otherwise: `std::collections::hash_map::DefaultHasher`
//!
//! All three are deterministic within a process, so a key hashes the same way
//! in every map.

use std::hash::{Hash, Hasher};

/// Bits consumed per trie level.
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Largest shift that still selects hash bits (slice 6 holds bits 30..32).
pub(crate) const MAX_SHIFT: u32 = 30;

/// Number of trie levels that can hold child nodes.
pub(crate) const MAX_DEPTH: usize = 7;

/// Mask selecting one slice.
const SLICE_MASK: u32 = 0x1f;

#[cfg(feature = "fxhash")]
fn new_hasher() -> rustc_hash::FxHasher {
    rustc_hash::FxHasher::default()
}

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
fn new_hasher() -> ahash::AHasher {
    use std::hash::BuildHasher;

    ahash::RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
    .build_hasher()
}

#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
fn new_hasher() -> std::collections::hash_map::DefaultHasher {
    std::collections::hash_map::DefaultHasher::new()
}

/// Computes the 32-bit trie hash of a key.
///
/// The 64-bit hasher output is folded so that both halves contribute.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn compute_hash<K: Hash + ?Sized>(key: &K) -> u32 {
    let mut hasher = new_hasher();
    key.hash(&mut hasher);
    let wide = hasher.finish();
    (wide ^ (wide >> 32)) as u32
}

/// Extracts the 5-bit slice of `hash` at `shift`.
#[inline]
pub(crate) const fn mask(hash: u32, shift: u32) -> u32 {
    (hash >> shift) & SLICE_MASK
}

/// Returns the bitmap bit for `hash` at `shift`.
#[inline]
pub(crate) const fn bitpos(hash: u32, shift: u32) -> u32 {
    1 << mask(hash, shift)
}

/// Counts the bits of `bitmap` below `bit`: the compact index of `bit`.
#[inline]
pub(crate) const fn index(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

/// Returns `true` once `shift` has moved past every hash bit.
#[inline]
pub(crate) const fn is_exhausted(shift: u32) -> bool {
    shift > MAX_SHIFT
}
