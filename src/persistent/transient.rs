//! Transient (batch-mutable) maps.
//!
//! A [`TransientLeanMap`] edits a trie in place for the duration of one
//! batch. Every node it creates is stamped with the batch's edit token; those
//! nodes are mutated directly on later operations, while nodes shared with a
//! published map are copied first. [`finalize`](TransientLeanMap::finalize)
//! retires the token and publishes the result as a [`LeanMap`].
//!
//! The handle is affine: it is neither `Clone` nor `Send`/`Sync`, so a batch
//! has exactly one owner on one thread. Using it after finalizing reports
//! [`StaleTransientError`].

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use super::edit::EditToken;
use super::hash::compute_hash;
use super::map::LeanMap;
use super::node::{Node, NodeRef};
use crate::error::{DuplicateKeyError, LeanMapError, StaleTransientError};

/// A mutable view of a map, used to apply a batch of changes cheaply.
///
/// Obtain one with [`LeanMap::transient`] or [`TransientLeanMap::new`], apply
/// changes, then publish with [`finalize`](Self::finalize) or
/// [`persistent`](Self::persistent). The map the transient was taken from is
/// never affected.
///
/// # Examples
///
/// ```rust
/// use leanmap::LeanMap;
///
/// let original: LeanMap<i32, &str> = [(1, "one"), (2, "two")].into_iter().collect();
///
/// let mut transient = original.transient();
/// transient.insert(3, "three")?;
/// transient.remove(&1)?;
/// let updated = transient.persistent()?;
///
/// assert_eq!(updated.len(), 2);
/// assert_eq!(updated.get(&3), Some(&"three"));
/// assert_eq!(original.get(&1), Some(&"one"));
/// # Ok::<(), leanmap::LeanMapError>(())
/// ```
///
/// Once finalized, the handle refuses further use:
///
/// ```rust
/// use leanmap::{LeanMapError, TransientLeanMap};
///
/// let mut transient = TransientLeanMap::new();
/// transient.insert("key", 1)?;
/// let map = transient.finalize()?;
///
/// assert_eq!(map.len(), 1);
/// assert!(matches!(
///     transient.insert("other", 2),
///     Err(LeanMapError::StaleTransient(_))
/// ));
/// # Ok::<(), LeanMapError>(())
/// ```
pub struct TransientLeanMap<K, V> {
    root: Option<NodeRef<K, V>>,
    count: usize,
    /// `None` once finalized.
    edit: Option<EditToken>,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientLeanMap<i32, i32>: Send, Sync, Clone);
static_assertions::assert_not_impl_any!(TransientLeanMap<String, Arc<String>>: Send, Sync, Clone);

impl<K, V> TransientLeanMap<K, V> {
    /// Creates an empty transient map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::TransientLeanMap;
    ///
    /// let transient: TransientLeanMap<String, i32> = TransientLeanMap::new();
    /// assert_eq!(transient.len(), Ok(0));
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(None, 0)
    }

    /// Opens a batch over an existing trie.
    pub(crate) fn from_parts(root: Option<NodeRef<K, V>>, count: usize) -> Self {
        let edit = EditToken::mint();
        #[cfg(feature = "tracing")]
        tracing::debug!(token = ?edit, count, "transient opened");
        Self {
            root,
            count,
            edit: Some(edit),
            _marker: PhantomData,
        }
    }

    /// Returns the live token, or the error reported for `operation` on a
    /// finalized handle.
    fn live(&self, operation: &'static str) -> Result<EditToken, StaleTransientError> {
        self.edit.ok_or_else(|| {
            #[cfg(feature = "tracing")]
            tracing::warn!(operation, "transient used after finalize");
            StaleTransientError { operation }
        })
    }

    /// Returns `true` until the transient has been finalized.
    #[inline]
    pub const fn is_live(&self) -> bool {
        self.edit.is_some()
    }

    /// Returns the number of entries.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::StaleTransient`] if the transient was finalized.
    pub fn len(&self) -> Result<usize, LeanMapError> {
        self.live("TransientLeanMap::len")?;
        Ok(self.count)
    }

    /// Returns `true` if the map holds no entries.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::StaleTransient`] if the transient was finalized.
    pub fn is_empty(&self) -> Result<bool, LeanMapError> {
        self.live("TransientLeanMap::is_empty")?;
        Ok(self.count == 0)
    }

    /// Returns the value for `key`, if present.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::StaleTransient`] if the transient was finalized.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<&V>, LeanMapError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.live("TransientLeanMap::get")?;
        Ok(self.lookup(key))
    }

    /// Returns `true` if `key` is present.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::StaleTransient`] if the transient was finalized.
    pub fn contains_key<Q>(&self, key: &Q) -> Result<bool, LeanMapError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.live("TransientLeanMap::contains_key")?;
        Ok(self.lookup(key).is_some())
    }

    fn lookup<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let root = self.root.as_deref()?;
        root.find(0, compute_hash(key), key).map(|(_, value)| value)
    }

    /// Hands over the trie built so far.
    pub(crate) fn into_parts(mut self) -> (Option<NodeRef<K, V>>, usize) {
        self.edit = None;
        let root = self.root.take().filter(|_| self.count > 0);
        (root, self.count)
    }
}

impl<K: Clone + Hash + Eq, V: Clone> TransientLeanMap<K, V> {
    fn assoc(&mut self, key: K, value: V) -> bool {
        let edit = self.edit;
        let root = self
            .root
            .get_or_insert_with(|| Arc::new(Node::empty(edit)));
        let hash = compute_hash(&key);
        let added = Node::assoc(root, edit, 0, hash, key, value);
        if added {
            self.count += 1;
        }
        added
    }

    /// Inserts every pair of `iter`, later pairs overwriting earlier ones.
    pub(crate) fn absorb<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.assoc(key, value);
        }
    }

    /// Associates `key` with `value`, replacing any previous value.
    ///
    /// Returns `true` if the key was not present before.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::StaleTransient`] if the transient was finalized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leanmap::TransientLeanMap;
    ///
    /// let mut transient = TransientLeanMap::new();
    /// assert_eq!(transient.insert("a", 1), Ok(true));
    /// assert_eq!(transient.insert("a", 2), Ok(false));
    /// assert_eq!(transient.get("a"), Ok(Some(&2)));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<bool, LeanMapError> {
        self.live("TransientLeanMap::insert")?;
        Ok(self.assoc(key, value))
    }

    /// Inserts `key` only if it is absent.
    ///
    /// # Errors
    ///
    /// - [`LeanMapError::DuplicateKey`] if `key` is already present; the map is
    ///   left unchanged
    /// - [`LeanMapError::StaleTransient`] if the transient was finalized
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(), LeanMapError> {
        const OPERATION: &str = "TransientLeanMap::try_insert";
        self.live(OPERATION)?;
        if self.lookup(&key).is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!(operation = OPERATION, "duplicate key rejected");
            return Err(DuplicateKeyError {
                operation: OPERATION,
            }
            .into());
        }
        self.assoc(key, value);
        Ok(())
    }

    /// Removes `key`.
    ///
    /// Returns `true` if the key was present.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::StaleTransient`] if the transient was finalized.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<bool, LeanMapError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let edit = self.live("TransientLeanMap::remove")?;
        let Some(root) = self.root.as_mut() else {
            return Ok(false);
        };
        let removed = Node::without(root, Some(edit), 0, compute_hash(key), key);
        if removed {
            self.count -= 1;
        }
        Ok(removed)
    }

    /// Inserts every pair of `iter`.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::StaleTransient`] if the transient was finalized.
    pub fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) -> Result<(), LeanMapError> {
        self.live("TransientLeanMap::extend")?;
        self.absorb(iter);
        Ok(())
    }

    /// Publishes the current contents and retires this handle.
    ///
    /// Afterwards every operation on the handle, including a second
    /// `finalize`, fails with [`LeanMapError::StaleTransient`].
    ///
    /// # Errors
    ///
    /// [`LeanMapError::StaleTransient`] if the transient was already finalized.
    pub fn finalize(&mut self) -> Result<LeanMap<K, V>, LeanMapError> {
        self.live("TransientLeanMap::finalize")?;
        #[cfg(feature = "tracing")]
        tracing::debug!(token = ?self.edit, count = self.count, "transient finalized");
        self.edit = None;
        let root = self.root.take().filter(|_| self.count > 0);
        let count = std::mem::take(&mut self.count);
        Ok(LeanMap::from_parts(root, count))
    }

    /// Consumes the handle and publishes its contents.
    ///
    /// # Errors
    ///
    /// [`LeanMapError::StaleTransient`] if the transient was already finalized.
    pub fn persistent(mut self) -> Result<LeanMap<K, V>, LeanMapError> {
        self.finalize()
    }
}

impl<K, V> Default for TransientLeanMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for TransientLeanMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransientLeanMap")
            .field("len", &self.count)
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}
