//! The persistent map.
//!
//! [`LeanMap`] is an immutable hash map stored as a compressed hash-array
//! mapped prefix trie. Every update returns a new map and leaves the original
//! untouched; the two share all nodes off the updated path.
//!
//! - O(log32 N) `get`, `insert` and `remove` (at most seven levels)
//! - O(1) `len`, `is_empty` and `clone`
//! - inline entries and children live in one compact array per node, so
//!   lookups touch few cache lines
//!
//! # Examples
//!
//! ```rust
//! use leanmap::LeanMap;
//!
//! let map = LeanMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//!
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(updated.get("one"), Some(&100));
//! assert_eq!(updated.len(), 2);
//! ```
//!
//! Large batches are cheaper through a transient:
//!
//! ```rust
//! use leanmap::LeanMap;
//!
//! let base: LeanMap<u32, u32> = (0..1_000).map(|key| (key, key)).collect();
//! let mut transient = base.transient();
//! for key in 0..1_000 {
//!     transient.insert(key, key * 2)?;
//! }
//! let doubled = transient.persistent()?;
//! assert_eq!(doubled.get(&500), Some(&1_000));
//! assert_eq!(base.get(&500), Some(&500));
//! # Ok::<(), leanmap::LeanMapError>(())
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{ControlFlow, Index};
use std::sync::Arc;

use super::cursor::{LeanMapIntoIter, LeanMapIter};
use super::fold::{Folder, TaskScheduler, fold_node};
use super::hash::compute_hash;
use super::node::{Node, NodeRef};
use super::transient::TransientLeanMap;
use crate::error::{DuplicateKeyError, LeanMapError, MalformedInputError};

/// A persistent (immutable) hash map.
///
/// `M` is the type of optional metadata attached to the map. Metadata rides
/// along through `insert` and `remove`, but plays no part in equality or
/// hashing.
///
/// # Examples
///
/// ```rust
/// use leanmap::LeanMap;
///
/// let map = LeanMap::singleton("a", 1).insert("b", 2);
/// let removed = map.remove("a");
///
/// assert_eq!(map.len(), 2);
/// assert_eq!(removed.len(), 1);
/// assert_eq!(removed.get("a"), None);
/// ```
pub struct LeanMap<K, V, M = ()> {
    root: Option<NodeRef<K, V>>,
    count: usize,
    meta: Option<Arc<M>>,
}

static_assertions::assert_impl_all!(LeanMap<String, i32>: Send, Sync, Clone);
static_assertions::assert_impl_all!(LeanMap<i32, Vec<u8>, String>: Send, Sync, Clone);

// =============================================================================
// Construction
// =============================================================================

impl<K, V> LeanMap<K, V> {
    /// Creates an empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map: LeanMap<String, i32> = LeanMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            count: 0,
            meta: None,
        }
    }

    pub(crate) const fn from_parts(root: Option<NodeRef<K, V>>, count: usize) -> Self {
        Self {
            root,
            count,
            meta: None,
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> LeanMap<K, V> {
    /// Creates a map holding a single entry.
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().insert(key, value)
    }

    /// Builds a map from pairs whose keys must all be distinct.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::DuplicateKey`] on the first repeated key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::{LeanMap, LeanMapError};
    ///
    /// let map = LeanMap::try_from_unique([("a", 1), ("b", 2)])?;
    /// assert_eq!(map.len(), 2);
    ///
    /// let error = LeanMap::try_from_unique([("a", 1), ("a", 2)]).unwrap_err();
    /// assert!(matches!(error, LeanMapError::DuplicateKey(_)));
    /// # Ok::<(), LeanMapError>(())
    /// ```
    pub fn try_from_unique<I>(iter: I) -> Result<Self, LeanMapError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        const OPERATION: &str = "LeanMap::try_from_unique";
        let mut transient = TransientLeanMap::new();
        for (key, value) in iter {
            if transient.contains_key(&key)? {
                #[cfg(feature = "tracing")]
                tracing::debug!(operation = OPERATION, "duplicate key rejected");
                return Err(DuplicateKeyError {
                    operation: OPERATION,
                }
                .into());
            }
            transient.insert(key, value)?;
        }
        transient.persistent()
    }

    /// Builds a map by pairing `keys` with `values` position by position.
    ///
    /// Repeated keys keep their last value.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::MalformedInput`] if the two sequences differ in length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map = LeanMap::from_keys_and_values(["a", "b"], [1, 2])?;
    /// assert_eq!(map.get("b"), Some(&2));
    ///
    /// assert!(LeanMap::from_keys_and_values(["a", "b"], [1]).is_err());
    /// # Ok::<(), leanmap::LeanMapError>(())
    /// ```
    pub fn from_keys_and_values<KI, VI>(keys: KI, values: VI) -> Result<Self, LeanMapError>
    where
        KI: IntoIterator<Item = K>,
        VI: IntoIterator<Item = V>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        let values: Vec<V> = values.into_iter().collect();
        if keys.len() != values.len() {
            return Err(MalformedInputError {
                operation: "LeanMap::from_keys_and_values",
                keys: keys.len(),
                values: values.len(),
            }
            .into());
        }
        Ok(keys.into_iter().zip(values).collect())
    }
}

impl<T: Clone + Hash + Eq> LeanMap<T, T> {
    /// Builds a map from an alternating `key, value, key, value, ...` sequence.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::MalformedInput`] if the sequence has odd length, i.e.
    /// the last key has no value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map = LeanMap::from_flat(["a", "1", "b", "2"])?;
    /// assert_eq!(map.get("a"), Some(&"1"));
    ///
    /// assert!(LeanMap::from_flat(["a", "1", "b"]).is_err());
    /// # Ok::<(), leanmap::LeanMapError>(())
    /// ```
    pub fn from_flat<I>(items: I) -> Result<Self, LeanMapError>
    where
        I: IntoIterator<Item = T>,
    {
        let items: Vec<T> = items.into_iter().collect();
        if items.len() % 2 != 0 {
            return Err(MalformedInputError {
                operation: "LeanMap::from_flat",
                keys: items.len() / 2 + 1,
                values: items.len() / 2,
            }
            .into());
        }
        let mut items = items.into_iter();
        let pairs = std::iter::from_fn(|| Some((items.next()?, items.next()?)));
        Ok(pairs.collect())
    }
}

// =============================================================================
// Queries
// =============================================================================

impl<K, V, M> LeanMap<K, V, M> {
    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map = LeanMap::new().insert("key".to_string(), 42);
    /// assert_eq!(map.get("key"), Some(&42));
    /// assert_eq!(map.get("missing"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let root = self.root.as_deref()?;
        root.find(0, compute_hash(key), key)
    }

    /// Returns the value for `key`, or `default` if it is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map = LeanMap::singleton("a", 1);
    /// assert_eq!(*map.get_or("a", &0), 1);
    /// assert_eq!(*map.get_or("z", &0), 0);
    /// ```
    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).is_some()
    }

    /// Returns `true` if both maps share the same trie, which implies they are
    /// equal.
    ///
    /// Removing an absent key, for instance, hands back a map that is
    /// `ptr_eq` to the original.
    pub fn ptr_eq<N>(&self, other: &LeanMap<K, V, N>) -> bool {
        self.count == other.count
            && match (&self.root, &other.root) {
                (Some(left), Some(right)) => Arc::ptr_eq(left, right),
                (None, None) => true,
                _ => false,
            }
    }

    /// Returns a lazy iterator over the entries, in unspecified order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map: LeanMap<i32, i32> = (1..=3).map(|key| (key, key * 10)).collect();
    /// let mut values: Vec<i32> = map.iter().map(|(_, value)| *value).collect();
    /// values.sort_unstable();
    /// assert_eq!(values, vec![10, 20, 30]);
    /// ```
    pub fn iter(&self) -> LeanMapIter<'_, K, V> {
        LeanMapIter::new(self.root.as_deref(), self.count)
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Opens a transient over this map's contents.
    ///
    /// The transient starts out sharing every node with `self`; nothing it
    /// does is visible through `self`. Metadata is not carried over.
    pub fn transient(&self) -> TransientLeanMap<K, V> {
        TransientLeanMap::from_parts(self.root.clone(), self.count)
    }
}

// =============================================================================
// Updates
// =============================================================================

impl<K: Clone + Hash + Eq, V: Clone, M> LeanMap<K, V, M> {
    fn with_root(&self, root: Option<NodeRef<K, V>>, count: usize) -> Self {
        Self {
            root: root.filter(|_| count > 0),
            count,
            meta: self.meta.clone(),
        }
    }

    /// Returns a map with `key` associated to `value`.
    ///
    /// An existing value for `key` is replaced.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map1 = LeanMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1));
    /// assert_eq!(map2.get("key"), Some(&2));
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let hash = compute_hash(&key);
        let mut root = self
            .root
            .clone()
            .unwrap_or_else(|| Arc::new(Node::empty(None)));
        let added = Node::assoc(&mut root, None, 0, hash, key, value);
        self.with_root(Some(root), self.count + usize::from(added))
    }

    /// Returns a map with `key` added, refusing to overwrite.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::DuplicateKey`] if `key` is already present.
    pub fn try_insert(&self, key: K, value: V) -> Result<Self, LeanMapError> {
        const OPERATION: &str = "LeanMap::try_insert";
        if self.contains_key(&key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(operation = OPERATION, "duplicate key rejected");
            return Err(DuplicateKeyError {
                operation: OPERATION,
            }
            .into());
        }
        Ok(self.insert(key, value))
    }

    /// Returns a map without `key`.
    ///
    /// Removing an absent key returns a map sharing this one's trie.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map = LeanMap::new().insert(1, "one").insert(2, "two");
    /// let removed = map.remove(&1);
    /// assert_eq!(removed.get(&1), None);
    ///
    /// let unchanged = map.remove(&99);
    /// assert!(unchanged.ptr_eq(&map));
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(root) = &self.root else {
            return self.clone();
        };
        let mut root = Arc::clone(root);
        if Node::without(&mut root, None, 0, compute_hash(key), key) {
            self.with_root(Some(root), self.count - 1)
        } else {
            self.clone()
        }
    }

    /// Applies `function` to the value for `key`.
    ///
    /// Returns `None` if the key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map = LeanMap::new().insert("count".to_string(), 10);
    /// let updated = map.update("count", |value| value + 1);
    ///
    /// assert_eq!(updated.unwrap().get("count"), Some(&11));
    /// assert!(map.update("missing", |value| value + 1).is_none());
    /// ```
    #[must_use]
    pub fn update<Q, F>(&self, key: &Q, function: F) -> Option<Self>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> V,
    {
        let (stored_key, value) = self.get_key_value(key)?;
        Some(self.insert(stored_key.clone(), function(value)))
    }

    /// Inserts, replaces or removes the value for `key`.
    ///
    /// `updater` receives the current value (if any); returning `None`
    /// removes the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map = LeanMap::new().insert("count".to_string(), 10);
    ///
    /// let incremented = map.update_with("count", |value| value.map(|value| value + 1));
    /// assert_eq!(incremented.get("count"), Some(&11));
    ///
    /// let inserted = map.update_with("new", |value| Some(value.copied().unwrap_or(100)));
    /// assert_eq!(inserted.get("new"), Some(&100));
    ///
    /// let removed = map.update_with("count", |_| None);
    /// assert!(removed.is_empty());
    /// ```
    #[must_use]
    pub fn update_with<Q, F>(&self, key: &Q, updater: F) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let current = self.get_key_value(key);
        match (current, updater(current.map(|(_, value)| value))) {
            (Some((stored_key, _)), Some(value)) => self.insert(stored_key.clone(), value),
            (Some(_), None) => self.remove(key),
            (None, Some(value)) => self.insert(key.to_owned(), value),
            (None, None) => self.clone(),
        }
    }

    /// Merges `other` into this map; on conflicting keys `other` wins.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let left = LeanMap::new().insert("a", 1).insert("b", 2);
    /// let right = LeanMap::new().insert("b", 20).insert("c", 3);
    ///
    /// let merged = left.merge(&right);
    /// assert_eq!(merged.get("a"), Some(&1));
    /// assert_eq!(merged.get("b"), Some(&20));
    /// assert_eq!(merged.get("c"), Some(&3));
    /// ```
    #[must_use]
    pub fn merge<N>(&self, other: &LeanMap<K, V, N>) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut transient = self.transient();
        transient.absorb(other.iter().map(|(key, value)| (key.clone(), value.clone())));
        let (root, count) = transient.into_parts();
        self.with_root(root, count)
    }
}

// =============================================================================
// Reduction
// =============================================================================

impl<K, V, M> LeanMap<K, V, M> {
    /// Folds the entries sequentially, stopping early on `Break`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::ops::ControlFlow;
    /// use leanmap::LeanMap;
    ///
    /// let map: LeanMap<i32, i32> = (0..100).map(|key| (key, 1)).collect();
    ///
    /// let total = map.reduce(0, |sum, _, value| ControlFlow::Continue(sum + *value));
    /// assert_eq!(total, 100);
    ///
    /// let capped = map.reduce(0, |sum, _, value| {
    ///     if sum == 10 { ControlFlow::Break(sum) } else { ControlFlow::Continue(sum + *value) }
    /// });
    /// assert_eq!(capped, 10);
    /// ```
    pub fn reduce<A, F>(&self, init: A, mut function: F) -> A
    where
        F: FnMut(A, &K, &V) -> ControlFlow<A, A>,
    {
        match self
            .iter()
            .try_fold(init, |accumulator, (key, value)| function(accumulator, key, value))
        {
            ControlFlow::Continue(result) | ControlFlow::Break(result) => result,
        }
    }

    /// Folds the entries by splitting the work along the trie.
    ///
    /// Each child subtree is folded as a separate task on `scheduler`,
    /// starting from `identity()`; inline entries are folded with
    /// `reduce_one`, and partial results are joined with `combine`. An empty
    /// map folds to `identity()`.
    ///
    /// `combine` must be associative with `identity()` as its neutral element
    /// for the result to be independent of the trie's shape.
    ///
    /// See [`ScopedThreads`](crate::ScopedThreads) for a multi-threaded
    /// example.
    pub fn fold<'scope, A, S, I, C, R>(
        &'scope self,
        identity: I,
        combine: C,
        reduce_one: R,
        scheduler: &S,
    ) -> A
    where
        K: Send + Sync,
        V: Send + Sync,
        A: Send + 'scope,
        S: TaskScheduler<'scope> + Clone + Send + 'scope,
        I: Fn() -> A + Send + Sync + 'scope,
        C: Fn(A, A) -> A + Send + Sync + 'scope,
        R: Fn(A, &K, &V) -> A + Send + Sync + 'scope,
    {
        let Some(root) = self.root.as_deref() else {
            return identity();
        };
        let folder = Arc::new(Folder {
            identity,
            combine,
            reduce_one,
        });
        fold_node(root, &folder, scheduler)
    }

    /// Folds the entries on the rayon thread pool.
    ///
    /// Same contract as [`fold`](Self::fold).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map: LeanMap<u64, u64> = (0..10_000).map(|key| (key, key)).collect();
    /// let total = map.par_fold(|| 0, |left, right| left + right, |sum, _, value| sum + *value);
    /// assert_eq!(total, 49_995_000);
    /// ```
    #[cfg(feature = "rayon")]
    pub fn par_fold<A, I, C, R>(&self, identity: I, combine: C, reduce_one: R) -> A
    where
        K: Send + Sync,
        V: Send + Sync,
        A: Send,
        I: Fn() -> A + Send + Sync,
        C: Fn(A, A) -> A + Send + Sync,
        R: Fn(A, &K, &V) -> A + Send + Sync,
    {
        let Some(root) = self.root.as_deref() else {
            return identity();
        };
        let folder = Folder {
            identity,
            combine,
            reduce_one,
        };
        super::fold::par_fold_node(root, &folder)
    }
}

// =============================================================================
// Metadata
// =============================================================================

impl<K, V, M> LeanMap<K, V, M> {
    /// Returns the attached metadata, if any.
    pub fn meta(&self) -> Option<&M> {
        self.meta.as_deref()
    }

    /// Returns the same contents with `meta` attached.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::LeanMap;
    ///
    /// let map = LeanMap::singleton("a", 1).with_meta("source: config");
    /// let updated = map.insert("b", 2);
    ///
    /// assert_eq!(updated.meta(), Some(&"source: config"));
    /// assert_eq!(updated.clone().without_meta(), updated.without_meta());
    /// ```
    #[must_use]
    pub fn with_meta<N>(self, meta: N) -> LeanMap<K, V, N> {
        LeanMap {
            root: self.root,
            count: self.count,
            meta: Some(Arc::new(meta)),
        }
    }

    /// Returns the same contents without metadata.
    #[must_use]
    pub fn without_meta(self) -> LeanMap<K, V> {
        LeanMap::from_parts(self.root, self.count)
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, M> Clone for LeanMap<K, V, M> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            count: self.count,
            meta: self.meta.clone(),
        }
    }
}

impl<K, V, M> Default for LeanMap<K, V, M> {
    fn default() -> Self {
        Self {
            root: None,
            count: 0,
            meta: None,
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for LeanMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut transient = TransientLeanMap::new();
        transient.absorb(iter);
        let (root, count) = transient.into_parts();
        Self::from_parts(root, count)
    }
}

impl<K: Clone + Hash + Eq, V: Clone, M> Extend<(K, V)> for LeanMap<K, V, M> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let mut transient = self.transient();
        transient.absorb(iter);
        let (root, count) = transient.into_parts();
        self.root = root;
        self.count = count;
    }
}

impl<'a, K, V, M> IntoIterator for &'a LeanMap<K, V, M> {
    type Item = (&'a K, &'a V);
    type IntoIter = LeanMapIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Clone, V: Clone, M> IntoIterator for LeanMap<K, V, M> {
    type Item = (K, V);
    type IntoIter = LeanMapIntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        LeanMapIntoIter::new(self.root, self.count)
    }
}

impl<K: Hash + Eq, V: PartialEq, M> PartialEq for LeanMap<K, V, M> {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.count == other.count
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|other_value| value == other_value))
    }
}

impl<K: Hash + Eq, V: Eq, M> Eq for LeanMap<K, V, M> {}

impl<K: Hash, V: Hash, M> Hash for LeanMap<K, V, M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Summing per-entry hashes makes the result independent of trie order.
        let combined = self
            .iter()
            .fold(0_u32, |sum, entry| sum.wrapping_add(compute_hash(&entry)));
        state.write_usize(self.count);
        state.write_u32(combined);
    }
}

impl<K, V, M, Q> Index<&Q> for LeanMap<K, V, M>
where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in LeanMap")
    }
}

impl<K: fmt::Debug, V: fmt::Debug, M> fmt::Debug for LeanMap<K, V, M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display, M> fmt::Display for LeanMap<K, V, M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        for (position, (key, value)) in self.iter().enumerate() {
            if position > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize, M> serde::Serialize for LeanMap<K, V, M> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct LeanMapVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<K, V> LeanMapVisitor<K, V> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for LeanMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = LeanMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        use serde::de::Error;
        let mut transient = TransientLeanMap::new();
        while let Some((key, value)) = access.next_entry()? {
            transient.insert(key, value).map_err(A::Error::custom)?;
        }
        transient.persistent().map_err(A::Error::custom)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for LeanMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(LeanMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_serialize_empty() {
        let map: LeanMap<String, i32> = LeanMap::new();
        assert_eq!(serde_json::to_string(&map).unwrap(), "{}");
    }

    #[rstest]
    fn test_serialize_single_entry() {
        let map = LeanMap::singleton("a".to_string(), 1);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"a":1}"#);
    }

    #[rstest]
    fn test_deserialize_last_duplicate_wins() {
        let map: LeanMap<String, i32> = serde_json::from_str(r#"{"a":1,"a":2}"#).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&2));
    }
}
