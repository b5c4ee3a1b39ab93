//! Stack-based traversal of a trie.
//!
//! Both iterators keep an explicit stack of frames, one per node on the path
//! from the root to the node currently being read. A frame yields its node's
//! inline entries first and then descends into its children in storage order.
//! No recursion is involved. Because the trie is at most seven branch levels
//! deep (plus one collision level), the stack lives inline in an
//! [`ArrayVec`].

use std::iter::FusedIterator;
use std::sync::Arc;

use arrayvec::ArrayVec;

use super::hash::MAX_DEPTH;
use super::node::{Node, NodeRef};

/// Seven branch levels plus the collision level below them.
const STACK_CAPACITY: usize = MAX_DEPTH + 1;

struct Frame<N> {
    node: N,
    next_entry: usize,
    next_child: usize,
}

impl<N> Frame<N> {
    const fn new(node: N) -> Self {
        Self {
            node,
            next_entry: 0,
            next_child: 0,
        }
    }
}

/// An iterator over the entries of a [`LeanMap`](crate::LeanMap).
///
/// Entries come out in trie order, which is stable for a given map value but
/// otherwise unspecified.
pub struct LeanMapIter<'a, K, V> {
    frames: ArrayVec<Frame<&'a Node<K, V>>, STACK_CAPACITY>,
    remaining: usize,
}

impl<'a, K, V> LeanMapIter<'a, K, V> {
    pub(crate) fn new(root: Option<&'a Node<K, V>>, len: usize) -> Self {
        let mut frames = ArrayVec::new();
        if let Some(root) = root {
            frames.push(Frame::new(root));
        }
        Self {
            frames,
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for LeanMapIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.frames.last_mut()?;
            let node = frame.node;
            if frame.next_entry < node.data_arity() {
                let entry = node.entry_at(frame.next_entry);
                frame.next_entry += 1;
                self.remaining = self.remaining.saturating_sub(1);
                return Some(entry);
            }
            if frame.next_child < node.node_arity() {
                let child = node.child_at(frame.next_child);
                frame.next_child += 1;
                self.frames.push(Frame::new(&**child));
            } else {
                self.frames.pop();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for LeanMapIter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for LeanMapIter<'_, K, V> {}

impl<K, V> Clone for LeanMapIter<'_, K, V> {
    fn clone(&self) -> Self {
        let frames = self
            .frames
            .iter()
            .map(|frame| Frame {
                node: frame.node,
                next_entry: frame.next_entry,
                next_child: frame.next_child,
            })
            .collect();
        Self {
            frames,
            remaining: self.remaining,
        }
    }
}

/// An owning iterator over the entries of a [`LeanMap`](crate::LeanMap).
///
/// Nodes shared with other maps are never taken apart, so entries are cloned
/// out of them.
pub struct LeanMapIntoIter<K, V> {
    frames: ArrayVec<Frame<NodeRef<K, V>>, STACK_CAPACITY>,
    remaining: usize,
}

impl<K, V> LeanMapIntoIter<K, V> {
    pub(crate) fn new(root: Option<NodeRef<K, V>>, len: usize) -> Self {
        let mut frames = ArrayVec::new();
        if let Some(root) = root {
            frames.push(Frame::new(root));
        }
        Self {
            frames,
            remaining: len,
        }
    }
}

impl<K: Clone, V: Clone> Iterator for LeanMapIntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.frames.last_mut()?;
            if frame.next_entry < frame.node.data_arity() {
                let (key, value) = frame.node.entry_at(frame.next_entry);
                let entry = (key.clone(), value.clone());
                frame.next_entry += 1;
                self.remaining = self.remaining.saturating_sub(1);
                return Some(entry);
            }
            if frame.next_child < frame.node.node_arity() {
                let child = Arc::clone(frame.node.child_at(frame.next_child));
                frame.next_child += 1;
                self.frames.push(Frame::new(child));
            } else {
                self.frames.pop();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for LeanMapIntoIter<K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K: Clone, V: Clone> FusedIterator for LeanMapIntoIter<K, V> {}
