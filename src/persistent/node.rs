//! Trie nodes and the insert / lookup / remove algorithms.
//!
//! # Layout
//!
//! A [`BranchNode`] keeps two bitmaps over the 32 positions selected by one
//! hash slice:
//!
//! - `datamap`: positions holding an inline key/value entry
//! - `nodemap`: positions holding a child node
//!
//! The two never overlap. All slots live in one vector: entries first, in
//! ascending bit order, then children in *descending* bit order. Keeping the
//! children at the high end lets an entry migrate into a child (and back)
//! with one removal and one insertion.
//!
//! A [`CollisionNode`] holds keys whose 32-bit hashes are fully equal. It only
//! appears once every slice has been consumed.
//!
//! # Mutation protocol
//!
//! Mutating operations take the node reference by `&mut` and either leave it
//! untouched (nothing to do), edit the node in place (a transient owns it), or
//! replace the reference with a fresh node. A node is edited in place only
//! when it carries the caller's live [`EditToken`] and the reference is the
//! sole owner; everything else is copied first, so any map that can still see
//! the old node is unaffected.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use super::edit::EditToken;
use super::hash::{BITS_PER_LEVEL, bitpos, compute_hash, index, is_exhausted, mask};

/// Shared reference to a trie node.
pub(crate) type NodeRef<K, V> = Arc<Node<K, V>>;

/// A trie node: either a bitmap-indexed branch or a hash-collision bucket.
#[derive(Clone)]
pub(crate) enum Node<K, V> {
    Branch(BranchNode<K, V>),
    Collision(CollisionNode<K, V>),
}

/// One slot of a branch node.
#[derive(Clone)]
pub(crate) enum Slot<K, V> {
    /// An inline key/value entry.
    Entry(K, V),
    /// A child one level down.
    Node(NodeRef<K, V>),
}

/// Bitmap-indexed branch node.
#[derive(Clone)]
pub(crate) struct BranchNode<K, V> {
    datamap: u32,
    nodemap: u32,
    slots: Vec<Slot<K, V>>,
    edit: Option<EditToken>,
}

/// Bucket of entries sharing one full hash.
#[derive(Clone)]
pub(crate) struct CollisionNode<K, V> {
    hash: u32,
    entries: Vec<(K, V)>,
    edit: Option<EditToken>,
}

// =============================================================================
// BranchNode slot surgery
// =============================================================================

impl<K, V> BranchNode<K, V> {
    const fn empty(edit: Option<EditToken>) -> Self {
        Self {
            datamap: 0,
            nodemap: 0,
            slots: Vec::new(),
            edit,
        }
    }

    fn singleton(datamap: u32, key: K, value: V, edit: Option<EditToken>) -> Self {
        Self {
            datamap,
            nodemap: 0,
            slots: vec![Slot::Entry(key, value)],
            edit,
        }
    }

    #[inline]
    const fn data_arity(&self) -> usize {
        self.datamap.count_ones() as usize
    }

    #[inline]
    const fn node_arity(&self) -> usize {
        self.nodemap.count_ones() as usize
    }

    #[inline]
    const fn data_index(&self, bit: u32) -> usize {
        index(self.datamap, bit)
    }

    #[inline]
    fn node_index(&self, bit: u32) -> usize {
        self.slots.len() - 1 - index(self.nodemap, bit)
    }

    fn entry(&self, slot: usize) -> (&K, &V) {
        match &self.slots[slot] {
            Slot::Entry(key, value) => (key, value),
            Slot::Node(_) => unreachable!("datamap slot {slot} holds a child"),
        }
    }

    fn child(&self, slot: usize) -> &NodeRef<K, V> {
        match &self.slots[slot] {
            Slot::Node(node) => node,
            Slot::Entry(..) => unreachable!("nodemap slot {slot} holds an entry"),
        }
    }

    fn child_mut(&mut self, slot: usize) -> &mut NodeRef<K, V> {
        match &mut self.slots[slot] {
            Slot::Node(node) => node,
            Slot::Entry(..) => unreachable!("nodemap slot {slot} holds an entry"),
        }
    }

    fn insert_entry(&mut self, bit: u32, key: K, value: V) {
        let slot = self.data_index(bit);
        self.slots.insert(slot, Slot::Entry(key, value));
        self.datamap |= bit;
    }

    fn remove_entry(&mut self, bit: u32) {
        let slot = self.data_index(bit);
        self.slots.remove(slot);
        self.datamap ^= bit;
    }

    fn set_value(&mut self, bit: u32, value: V) {
        let slot = self.data_index(bit);
        if let Slot::Entry(_, current) = &mut self.slots[slot] {
            *current = value;
        }
    }

    fn set_child(&mut self, bit: u32, node: NodeRef<K, V>) {
        let slot = self.node_index(bit);
        self.slots[slot] = Slot::Node(node);
    }

    fn remove_child(&mut self, bit: u32) {
        let slot = self.node_index(bit);
        self.slots.remove(slot);
        self.nodemap ^= bit;
    }

    /// Replaces the entry at `bit` with a child node.
    fn migrate_entry_to_node(&mut self, bit: u32, node: NodeRef<K, V>) {
        // Target position computed against the pre-removal length.
        let target = self.slots.len() - 1 - index(self.nodemap, bit);
        self.slots.remove(self.data_index(bit));
        self.slots.insert(target, Slot::Node(node));
        self.datamap ^= bit;
        self.nodemap |= bit;
    }

    /// Replaces the child at `bit` with an inline entry.
    fn migrate_node_to_entry(&mut self, bit: u32, key: K, value: V) {
        self.slots.remove(self.node_index(bit));
        self.nodemap ^= bit;
        self.insert_entry(bit, key, value);
    }
}

impl<K, V> CollisionNode<K, V> {
    fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.entries
            .iter()
            .position(|(entry_key, _)| entry_key.borrow() == key)
    }
}

// =============================================================================
// Shape accessors
// =============================================================================

impl<K, V> Node<K, V> {
    /// An empty branch node, the root of an empty trie.
    pub(crate) const fn empty(edit: Option<EditToken>) -> Self {
        Self::Branch(BranchNode::empty(edit))
    }

    fn as_branch(&self) -> &BranchNode<K, V> {
        match self {
            Self::Branch(branch) => branch,
            Self::Collision(_) => unreachable!("expected a branch node"),
        }
    }

    #[inline]
    pub(crate) const fn edit(&self) -> Option<EditToken> {
        match self {
            Self::Branch(branch) => branch.edit,
            Self::Collision(collision) => collision.edit,
        }
    }

    /// Number of inline entries.
    #[inline]
    pub(crate) const fn data_arity(&self) -> usize {
        match self {
            Self::Branch(branch) => branch.data_arity(),
            Self::Collision(collision) => collision.entries.len(),
        }
    }

    /// Number of children.
    #[inline]
    pub(crate) const fn node_arity(&self) -> usize {
        match self {
            Self::Branch(branch) => branch.node_arity(),
            Self::Collision(_) => 0,
        }
    }

    #[inline]
    pub(crate) const fn has_data(&self) -> bool {
        self.data_arity() != 0
    }

    #[inline]
    pub(crate) const fn has_nodes(&self) -> bool {
        self.node_arity() != 0
    }

    /// Returns `true` for a branch holding exactly one entry and no children.
    pub(crate) const fn is_single_entry(&self) -> bool {
        match self {
            Self::Branch(branch) => branch.nodemap == 0 && branch.data_arity() == 1,
            Self::Collision(collision) => collision.entries.len() == 1,
        }
    }

    pub(crate) const fn is_empty(&self) -> bool {
        match self {
            Self::Branch(branch) => branch.datamap == 0 && branch.nodemap == 0,
            Self::Collision(collision) => collision.entries.is_empty(),
        }
    }

    /// The `index`-th inline entry, `index < data_arity()`.
    pub(crate) fn entry_at(&self, index: usize) -> (&K, &V) {
        match self {
            Self::Branch(branch) => branch.entry(index),
            Self::Collision(collision) => {
                let (key, value) = &collision.entries[index];
                (key, value)
            }
        }
    }

    /// The `index`-th child in storage order, `index < node_arity()`.
    pub(crate) fn child_at(&self, index: usize) -> &NodeRef<K, V> {
        match self {
            Self::Branch(branch) => branch.child(branch.data_arity() + index),
            Self::Collision(_) => unreachable!("collision nodes have no children"),
        }
    }

    /// Iterates the inline entries in storage order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        (0..self.data_arity()).map(move |index| self.entry_at(index))
    }

    /// Iterates the child references in storage order.
    pub(crate) fn children(&self) -> impl Iterator<Item = &NodeRef<K, V>> {
        let slots: &[Slot<K, V>] = match self {
            Self::Branch(branch) => &branch.slots[branch.data_arity()..],
            Self::Collision(_) => &[],
        };
        slots.iter().filter_map(|slot| match slot {
            Slot::Node(node) => Some(node),
            Slot::Entry(..) => None,
        })
    }
}

// =============================================================================
// Lookup
// =============================================================================

impl<K, V> Node<K, V> {
    /// Finds the entry for `key`, whose trie hash is `hash`, starting at `shift`.
    pub(crate) fn find<Q>(&self, shift: u32, hash: u32, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut node = self;
        let mut shift = shift;
        loop {
            match node {
                Self::Branch(branch) => {
                    let bit = bitpos(hash, shift);
                    if branch.datamap & bit != 0 {
                        let (current_key, value) = branch.entry(branch.data_index(bit));
                        return (current_key.borrow() == key).then_some((current_key, value));
                    } else if branch.nodemap & bit != 0 {
                        node = &**branch.child(branch.node_index(bit));
                        shift += BITS_PER_LEVEL;
                    } else {
                        return None;
                    }
                }
                Self::Collision(collision) => {
                    return collision
                        .entries
                        .iter()
                        .find(|(entry_key, _)| entry_key.borrow() == key)
                        .map(|(entry_key, value)| (entry_key, value));
                }
            }
        }
    }
}

// =============================================================================
// Insertion and removal
// =============================================================================

impl<K: Clone + Hash + Eq, V: Clone> Node<K, V> {
    /// Returns `true` when `node` may be changed in place under `edit`.
    fn is_editable(node: &mut NodeRef<K, V>, edit: Option<EditToken>) -> bool {
        EditToken::allows(edit, node.edit()) && Arc::get_mut(node).is_some()
    }

    /// Copies this node stamped with `edit`.
    fn copy_for(&self, edit: Option<EditToken>) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Self::Branch(branch) => branch.edit = edit,
            Self::Collision(collision) => collision.edit = edit,
        }
        copy
    }

    /// Makes `node` writable under `edit`, copying it unless it is editable.
    fn writable(node: &mut NodeRef<K, V>, edit: Option<EditToken>) -> &mut Self {
        if !Self::is_editable(node, edit) {
            *node = Arc::new(node.copy_for(edit));
        }
        Arc::make_mut(node)
    }

    fn writable_branch(node: &mut NodeRef<K, V>, edit: Option<EditToken>) -> &mut BranchNode<K, V> {
        match Self::writable(node, edit) {
            Self::Branch(branch) => branch,
            Self::Collision(_) => unreachable!("expected a branch node"),
        }
    }

    fn writable_collision(
        node: &mut NodeRef<K, V>,
        edit: Option<EditToken>,
    ) -> &mut CollisionNode<K, V> {
        match Self::writable(node, edit) {
            Self::Collision(collision) => collision,
            Self::Branch(_) => unreachable!("expected a collision node"),
        }
    }

    /// Associates `key` with `value` in the subtree at `node`.
    ///
    /// Returns `true` if the key was not present before.
    pub(crate) fn assoc(
        node: &mut NodeRef<K, V>,
        edit: Option<EditToken>,
        shift: u32,
        hash: u32,
        key: K,
        value: V,
    ) -> bool {
        let branch = match &**node {
            Self::Branch(branch) => branch,
            Self::Collision(collision) => {
                debug_assert_eq!(collision.hash, hash);
                let found = collision.position(&key);
                let target = Self::writable_collision(node, edit);
                return match found {
                    Some(position) => {
                        target.entries[position].1 = value;
                        false
                    }
                    None => {
                        target.entries.push((key, value));
                        true
                    }
                };
            }
        };

        let bit = bitpos(hash, shift);
        if branch.datamap & bit != 0 {
            let (current_key, current_value) = branch.entry(branch.data_index(bit));
            if *current_key == key {
                Self::writable_branch(node, edit).set_value(bit, value);
                false
            } else {
                let merged = Self::merge_two_pairs(
                    edit,
                    shift + BITS_PER_LEVEL,
                    (compute_hash(current_key), current_key.clone(), current_value.clone()),
                    (hash, key, value),
                );
                Self::writable_branch(node, edit).migrate_entry_to_node(bit, merged);
                true
            }
        } else if branch.nodemap & bit != 0 {
            let slot = branch.node_index(bit);
            if Self::is_editable(node, edit) {
                let child = Self::writable_branch(node, edit).child_mut(slot);
                return Self::assoc(child, edit, shift + BITS_PER_LEVEL, hash, key, value);
            }
            let original = node.as_branch().child(slot);
            let mut child = Arc::clone(original);
            let added = Self::assoc(&mut child, edit, shift + BITS_PER_LEVEL, hash, key, value);
            if !Arc::ptr_eq(&child, original) {
                Self::writable_branch(node, edit).set_child(bit, child);
            }
            added
        } else {
            Self::writable_branch(node, edit).insert_entry(bit, key, value);
            true
        }
    }

    /// Builds the subtree holding two entries that collided at the level
    /// above `shift`.
    fn merge_two_pairs(
        edit: Option<EditToken>,
        shift: u32,
        current: (u32, K, V),
        incoming: (u32, K, V),
    ) -> NodeRef<K, V> {
        let (current_hash, current_key, current_value) = current;
        let (hash, key, value) = incoming;

        if is_exhausted(shift) {
            // Every slice matched, so the full hashes are equal.
            return Arc::new(Self::Collision(CollisionNode {
                hash: current_hash,
                entries: vec![(current_key, current_value), (key, value)],
                edit,
            }));
        }

        let current_mask = mask(current_hash, shift);
        let incoming_mask = mask(hash, shift);

        let node = if current_mask == incoming_mask {
            let child = Self::merge_two_pairs(
                edit,
                shift + BITS_PER_LEVEL,
                (current_hash, current_key, current_value),
                (hash, key, value),
            );
            BranchNode {
                datamap: 0,
                nodemap: bitpos(current_hash, shift),
                slots: vec![Slot::Node(child)],
                edit,
            }
        } else {
            let slots = if current_mask < incoming_mask {
                vec![
                    Slot::Entry(current_key, current_value),
                    Slot::Entry(key, value),
                ]
            } else {
                vec![
                    Slot::Entry(key, value),
                    Slot::Entry(current_key, current_value),
                ]
            };
            BranchNode {
                datamap: bitpos(current_hash, shift) | bitpos(hash, shift),
                nodemap: 0,
                slots,
                edit,
            }
        };
        Arc::new(Self::Branch(node))
    }

    /// Removes `key` from the subtree at `node`.
    ///
    /// Returns `true` if the key was present. When it was not, `node` is left
    /// untouched.
    pub(crate) fn without<Q>(
        node: &mut NodeRef<K, V>,
        edit: Option<EditToken>,
        shift: u32,
        hash: u32,
        key: &Q,
    ) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let branch = match &**node {
            Self::Branch(branch) => branch,
            Self::Collision(collision) => {
                let Some(position) = collision.position(key) else {
                    return false;
                };
                match collision.entries.len() {
                    1 => *node = Arc::new(Self::empty(edit)),
                    2 => {
                        let datamap = bitpos(collision.hash, 0);
                        let (survivor_key, survivor_value) = collision.entries[1 - position].clone();
                        let collapsed =
                            BranchNode::singleton(datamap, survivor_key, survivor_value, edit);
                        *node = Arc::new(Self::Branch(collapsed));
                    }
                    _ => {
                        Self::writable_collision(node, edit).entries.remove(position);
                    }
                }
                return true;
            }
        };

        let bit = bitpos(hash, shift);
        if branch.datamap & bit != 0 {
            let slot = branch.data_index(bit);
            if branch.entry(slot).0.borrow() != key {
                return false;
            }
            if branch.data_arity() == 2 && branch.nodemap == 0 {
                let (survivor_key, survivor_value) = branch.entry(1 - slot);
                // Deeper nodes collapse to a singleton positioned for the
                // root, ready to be inlined (or to become the root) above.
                let datamap = if shift == 0 {
                    branch.datamap ^ bit
                } else {
                    bitpos(compute_hash(survivor_key), 0)
                };
                let collapsed = BranchNode::singleton(
                    datamap,
                    survivor_key.clone(),
                    survivor_value.clone(),
                    edit,
                );
                *node = Arc::new(Self::Branch(collapsed));
            } else {
                Self::writable_branch(node, edit).remove_entry(bit);
            }
            true
        } else if branch.nodemap & bit != 0 {
            let slot = branch.node_index(bit);
            let only_child = branch.datamap == 0 && branch.nodemap == bit;
            let child = if Self::is_editable(node, edit) {
                let target = Self::writable_branch(node, edit).child_mut(slot);
                if !Self::without(target, edit, shift + BITS_PER_LEVEL, hash, key) {
                    return false;
                }
                Arc::clone(target)
            } else {
                let mut child = Arc::clone(node.as_branch().child(slot));
                if !Self::without(&mut child, edit, shift + BITS_PER_LEVEL, hash, key) {
                    return false;
                }
                child
            };
            Self::compact_child(node, edit, bit, child, only_child);
            true
        } else {
            false
        }
    }

    /// Re-attaches a child that lost an entry, collapsing it where possible.
    fn compact_child(
        node: &mut NodeRef<K, V>,
        edit: Option<EditToken>,
        bit: u32,
        child: NodeRef<K, V>,
        only_child: bool,
    ) {
        if child.is_single_entry() {
            if only_child {
                *node = child;
            } else {
                let (key, value) = child.entry_at(0);
                let (key, value) = (key.clone(), value.clone());
                Self::writable_branch(node, edit).migrate_node_to_entry(bit, key, value);
            }
        } else if child.is_empty() {
            Self::writable_branch(node, edit).remove_child(bit);
        } else {
            Self::writable_branch(node, edit).set_child(bit, child);
        }
    }
}

// =============================================================================
// Structural checks (tests only)
// =============================================================================

#[cfg(test)]
impl<K: Hash + Eq, V> Node<K, V> {
    /// Asserts the layout invariants below this node and returns
    /// `(entry_count, depth)`.
    pub(crate) fn validate(&self, shift: u32) -> (usize, usize) {
        match self {
            Self::Branch(branch) => {
                assert_eq!(branch.datamap & branch.nodemap, 0, "bitmaps overlap");
                assert_eq!(
                    branch.slots.len(),
                    branch.data_arity() + branch.node_arity(),
                    "slot count does not match bitmaps"
                );
                let mut previous_mask = None;
                for (position, (key, _)) in self.entries().enumerate() {
                    let hash = compute_hash(key);
                    let key_mask = mask(hash, shift);
                    assert_eq!(index(branch.datamap, 1 << key_mask), position);
                    if let Some(previous) = previous_mask {
                        assert!(previous < key_mask, "entries not ascending");
                    }
                    previous_mask = Some(key_mask);
                }
                let mut count = branch.data_arity();
                let mut depth = 1;
                let mut previous_bit: Option<u32> = None;
                let children: Vec<_> = self.children().collect();
                for child in children {
                    let bit = Self::first_bit(child, shift);
                    if let Some(previous) = previous_bit {
                        assert!(previous > bit, "children not descending");
                    }
                    assert_ne!(branch.nodemap & bit, 0, "child under an unset nodemap bit");
                    previous_bit = Some(bit);
                    assert!(!child.is_single_entry(), "uncompacted single-entry child");
                    assert!(!child.is_empty(), "empty child");
                    let (child_count, child_depth) = child.validate(shift + BITS_PER_LEVEL);
                    count += child_count;
                    depth = depth.max(child_depth + 1);
                }
                (count, depth)
            }
            Self::Collision(collision) => {
                assert!(collision.entries.len() >= 2, "collision node below two entries");
                for (key, _) in &collision.entries {
                    assert_eq!(compute_hash(key), collision.hash);
                }
                (collision.entries.len(), 1)
            }
        }
    }

    /// The bit that any key below `child` occupies at `shift`.
    fn first_bit(child: &Self, shift: u32) -> u32 {
        let mut node = child;
        loop {
            if node.has_data() {
                let (key, _) = node.entry_at(0);
                return bitpos(compute_hash(key), shift);
            }
            node = &**node.child_at(0);
        }
    }
}
