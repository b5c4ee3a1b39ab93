//! Persistent hash map and its transient companion.
//!
//! - [`LeanMap`]: persistent hash map (compressed hash-array mapped prefix trie)
//! - [`TransientLeanMap`]: single-owner batch editor for a [`LeanMap`]
//! - [`LeanMapIter`] / [`LeanMapIntoIter`]: stack-based cursors over the trie
//! - [`TaskScheduler`], [`Sequential`], [`ScopedThreads`]: fork/join folding
//!
//! # Structural Sharing
//!
//! Every update copies only the nodes on the path from the root to the
//! changed entry and shares everything else with the previous version. Nodes
//! are reference counted with `Arc`, so published maps may be read from many
//! threads at once.
//!
//! # Examples
//!
//! ```rust
//! use leanmap::persistent::LeanMap;
//!
//! let map = LeanMap::new()
//!     .insert("a", 1)
//!     .insert("b", 2)
//!     .insert("c", 3);
//!
//! let without_b = map.remove("b");
//! assert_eq!(map.len(), 3);         // Original unchanged
//! assert_eq!(without_b.len(), 2);   // New version
//! assert_eq!(without_b.get("c"), Some(&3));
//! ```

mod cursor;
mod edit;
mod fold;
mod hash;
mod map;
mod node;
mod transient;

pub use cursor::LeanMapIntoIter;
pub use cursor::LeanMapIter;
pub use fold::ScopedThreads;
pub use fold::Sequential;
pub use fold::TaskScheduler;
pub use map::LeanMap;
pub use transient::TransientLeanMap;
