//! # leanmap
//!
//! A persistent hash map for Rust, built on a compressed hash-array mapped
//! prefix trie, with transient batch editing and fork/join folding.
//!
//! ## Overview
//!
//! - **Persistent updates**: `insert` and `remove` return new maps; old
//!   versions stay valid and share structure with the new ones
//! - **Transients**: a single-owner handle that edits nodes in place while a
//!   batch is open, then publishes an ordinary [`LeanMap`]
//! - **Cursor iteration**: a stack-based, allocation-free walk of the trie
//! - **Reduction**: early-terminating `reduce` and a `fold` that splits work
//!   per subtree on a pluggable [`TaskScheduler`]
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for [`LeanMap`]
//! - `rayon`: [`LeanMap::par_fold`] on the rayon thread pool
//! - `fxhash`: hash keys with `rustc_hash::FxHasher`
//! - `ahash`: hash keys with `ahash` (fixed seeds)
//! - `tracing`: emit `tracing` events for transient lifecycle and fold tasks
//! - `full`: `serde`, `rayon` and `tracing`
//!
//! ## Example
//!
//! ```rust
//! use leanmap::prelude::*;
//!
//! let map: LeanMap<&str, i32> = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
//! let map = map.remove("b");
//!
//! assert_eq!(map.get("a"), Some(&1));
//! assert_eq!(map.get("b"), None);
//! assert_eq!(map.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use leanmap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::LeanMapError;
    pub use crate::persistent::*;
}

pub mod error;
pub mod persistent;

pub use error::{DuplicateKeyError, LeanMapError, MalformedInputError, StaleTransientError};
pub use persistent::{
    LeanMap, LeanMapIntoIter, LeanMapIter, ScopedThreads, Sequential, TaskScheduler,
    TransientLeanMap,
};
