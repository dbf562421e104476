/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

mod encoded;
mod sparse_array_u32;

pub use self::encoded::{EncodedTree, NoSource, TreeEncoder};

use self::sparse_array_u32::sparse_array_u32_utils;
use self::sparse_array_u32::SparseArrayU32;
use crate::sequence::small_buffer::SmallBuffer;
use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::fmt::Display;
use std::hash::BuildHasher;
use std::hash::Hash;
use std::io;
use std::mem;
use std::ops::Index;
use std::slice;

/// Hash of a key, as consumed by the tree.
pub type HashValue = u64;

/// Bits of the hash consumed per level.
const CHUNK_BITS: u32 = 5;

/// Fan-out of an interior node.
const DEGREE: usize = 1 << CHUNK_BITS;

const HASH_BITS: u32 = HashValue::BITS;

/// Deepest possible chain of nodes, used to size traversal stacks.
const MAX_DEPTH: usize = (HASH_BITS / CHUNK_BITS) as usize + 1;

/// Creates a [`HashTree`](crate::HashTree) containing the given arguments:
///
/// ```
/// # use doctrie::*;
/// let t = hash_tree![1 => "one", 2 => "two", 3 => "three"];
///
/// assert_eq!(t.get(&2), Some(&"two"));
/// assert_eq!(t.count(), 3);
/// ```
#[macro_export]
macro_rules! hash_tree {
    ($($k:expr => $v:expr),*) => {
        {
            #[allow(unused_mut)]
            let mut t = $crate::HashTree::new();
            $(
                t.insert($k, $v);
            )*
            t
        }
    };
}

/// A mutable map implemented with a
/// [hash array mapped trie](https://en.wikipedia.org/wiki/Hash_array_mapped_trie).
///
/// # Complexity
///
/// Let *n* be the number of entries in the tree.
///
/// | Operation    | Best case | Average | Worst case |
/// |:------------ | ---------:| -------:| ----------:|
/// | `new()`      |      Θ(1) |    Θ(1) |       Θ(1) |
/// | `insert()`   |      Θ(1) |    Θ(1) |       Θ(n) |
/// | `remove()`   |      Θ(1) |    Θ(1) |       Θ(n) |
/// | `get()`      |      Θ(1) |    Θ(1) |       Θ(n) |
/// | `count()`    |      Θ(n) |    Θ(n) |       Θ(n) |
///
/// Note that `count()` walks the tree; it is not a stored size.
///
/// # Implementation details
///
/// The hash of a key is consumed in 5-bit chunks, least significant first,
/// one chunk per level.  An interior node keeps a 32-bit bitmap of the
/// occupied slots and a compacted child array holding exactly one entry per
/// set bit, so sparse nodes stay small.  See the `Node` documentation for the
/// node forms.
///
/// A tree can wrap a previously serialized tree through an [`EncodedTree`]
/// source.  Reads resolve against the encoded data in place; the first
/// mutation materializes the nodes along the path it touches, leaving every
/// untouched subtree as a reference into the encoded data.
/// [`write_to`](HashTree::write_to) hands those still-encoded subtrees back
/// to the encoder so it can emit a delta instead of a full rewrite.
///
/// # Invariants
///
/// The tree has the following invariants (among others):
///
///   1. The root is the only node that can have zero children, and it keeps
///      a capacity of 32 from the moment it exists.
///   2. In every interior node the number of children equals the number of
///      set bitmap bits, and never exceeds the node's capacity.
///   3. Distinct keys whose hashes agree on every usable chunk cannot be
///      stored; insertion panics instead.  Over a 64-bit hash this is not
///      reachable in practice, but a dedicated collision leaf remains an
///      open issue.
#[derive(Debug)]
pub struct HashTree<K, V, H: BuildHasher = RandomState, S: EncodedTree<K, V> = NoSource> {
    root: Option<Node<K, V, S::Ref>>,
    source: Option<S>,
    hasher_builder: H,
}

/// A node of the tree.
///
/// `R` is the encoded-node handle of the tree's [`EncodedTree`] source.  For
/// a tree built purely in memory `R` is uninhabited and only the first two
/// forms occur.  An `Encoded` node stands for a whole untouched subtree of
/// the encoded data; reads look through it and mutations replace it with its
/// materialized form one node at a time.
#[derive(Debug)]
enum Node<K, V, R> {
    Interior(SparseArrayU32<Box<Node<K, V, R>>>),
    Leaf(LeafNode<K, V>),
    Encoded(R),
}

#[derive(Debug)]
struct LeafNode<K, V> {
    key_hash: HashValue,
    key: K,
    value: V,
}

mod node_utils {
    use super::HashValue;
    use super::DEGREE;
    use std::hash::BuildHasher;
    use std::hash::Hash;
    use std::hash::Hasher;

    /// The slot selected by the hash chunk at `shift`.
    #[inline]
    pub fn chunk(hash: HashValue, shift: u32) -> usize {
        debug_assert!(shift < super::HASH_BITS);

        ((hash >> shift) & (DEGREE as HashValue - 1)) as usize
    }

    pub fn hash<T: ?Sized + Hash, H: BuildHasher>(v: &T, hasher_builder: &H) -> HashValue {
        let mut hasher = hasher_builder.build_hasher();

        v.hash(&mut hasher);

        hasher.finish()
    }
}

mod encoded_utils {
    use super::*;

    pub fn get<'a, K, V, Q: ?Sized, S>(
        source: &'a S,
        node: S::Ref,
        key: &Q,
        key_hash: HashValue,
        shift: u32,
    ) -> Option<&'a V>
    where
        K: Borrow<Q> + Eq + Hash,
        Q: Hash + Eq,
        S: EncodedTree<K, V>,
    {
        let mut node = node;
        let mut shift = shift;

        loop {
            match source.interior_bitmap(node) {
                Some(bitmap) => {
                    let index = node_utils::chunk(key_hash, shift);

                    match sparse_array_u32_utils::map_index(bitmap, index) {
                        Some(i) => {
                            node = source.child(node, i);
                            shift += CHUNK_BITS;
                        }
                        None => return None,
                    }
                }
                None => {
                    let matches = source.leaf_hash(node) == key_hash
                        && source.leaf_key(node).borrow() == key;

                    return if matches { Some(source.leaf_value(node)) } else { None };
                }
            }
        }
    }

    pub fn count<K, V, S>(source: &S, node: S::Ref) -> usize
    where
        S: EncodedTree<K, V>,
    {
        match source.interior_bitmap(node) {
            Some(bitmap) => (0..bitmap.count_ones() as usize)
                .map(|i| count(source, source.child(node, i)))
                .sum(),
            None => 1,
        }
    }

    /// Expands a single encoded node into its mutable form.  The children of
    /// an interior node stay encoded references.
    pub fn materialize<K, V, S>(source: &S, node: S::Ref) -> Node<K, V, S::Ref>
    where
        K: Eq + Hash,
        S: EncodedTree<K, V>,
    {
        match source.interior_bitmap(node) {
            Some(bitmap) => {
                let mut children: SparseArrayU32<Box<Node<K, V, S::Ref>>> = SparseArrayU32::new();

                let mut i = 0;
                for index in 0..DEGREE {
                    if bitmap & (1u32 << index) != 0 {
                        children.set(index, Box::new(Node::Encoded(source.child(node, i))));
                        i += 1;
                    }
                }

                Node::Interior(children)
            }
            None => {
                let (key_hash, key, value) = source.leaf_entry(node);

                Node::Leaf(LeafNode { key_hash, key, value })
            }
        }
    }

    pub fn dump<K, V, S, W>(
        source: &S,
        node: S::Ref,
        out: &mut W,
        indent: usize,
    ) -> io::Result<()>
    where
        S: EncodedTree<K, V>,
        W: io::Write,
    {
        match source.interior_bitmap(node) {
            None => write!(out, " *{:08x}", source.leaf_hash(node)),
            Some(bitmap) => {
                let total = bitmap.count_ones() as usize;
                let mut leaves = total;

                write!(out, "{:width$}*{{", "", width = 2 * indent)?;

                for i in 0..total {
                    let child = source.child(node, i);

                    if source.interior_bitmap(child).is_some() {
                        leaves -= 1;
                        writeln!(out)?;
                        dump(source, child, out, indent + 1)?;
                    }
                }

                if leaves > 0 {
                    if leaves < total {
                        write!(out, "\n{:width$} ", "", width = 2 * indent)?;
                    }

                    for i in 0..total {
                        let child = source.child(node, i);

                        if source.interior_bitmap(child).is_none() {
                            write!(out, " *{:08x}", source.leaf_hash(child))?;
                        }
                    }
                }

                write!(out, " }}")
            }
        }
    }
}

impl<K: Eq, V> LeafNode<K, V> {
    #[inline]
    fn matches<Q: ?Sized>(&self, key: &Q, key_hash: HashValue) -> bool
    where
        K: Borrow<Q>,
        Q: Eq,
    {
        self.key_hash == key_hash && self.key.borrow() == key
    }
}

impl<K, V, R: Copy> Node<K, V, R>
where
    K: Eq + Hash,
{
    fn new_root() -> Node<K, V, R> {
        let mut children = SparseArrayU32::new();

        // The root is the node most likely to reach full fan-out.
        children.reserve(DEGREE);

        Node::Interior(children)
    }

    fn count<S>(&self, source: Option<&S>) -> usize
    where
        S: EncodedTree<K, V, Ref = R>,
    {
        match self {
            Node::Interior(children) => children.iter().map(|child| child.count(source)).sum(),
            Node::Leaf(_) => 1,
            Node::Encoded(node) => {
                let source = source.expect("encoded node without a source");

                encoded_utils::count(source, *node)
            }
        }
    }

    fn get<'a, Q: ?Sized, S>(
        &'a self,
        key: &Q,
        key_hash: HashValue,
        shift: u32,
        source: Option<&'a S>,
    ) -> Option<&'a V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
        S: EncodedTree<K, V, Ref = R>,
    {
        match self {
            Node::Interior(children) => children
                .get(node_utils::chunk(key_hash, shift))
                .and_then(|child| child.get(key, key_hash, shift + CHUNK_BITS, source)),
            Node::Leaf(leaf) => {
                if leaf.matches(key, key_hash) {
                    Some(&leaf.value)
                } else {
                    None
                }
            }
            Node::Encoded(node) => {
                let source = source.expect("encoded node without a source");

                encoded_utils::get(source, *node, key, key_hash, shift)
            }
        }
    }

    fn insert<S>(&mut self, new_leaf: LeafNode<K, V>, shift: u32, source: Option<&S>)
    where
        S: EncodedTree<K, V, Ref = R>,
    {
        assert!(
            shift + CHUNK_BITS < HASH_BITS,
            "distinct keys with fully colliding hashes"
        );

        let children = match self {
            Node::Interior(children) => children,
            _ => unreachable!("insertion descends through interior nodes"),
        };
        let index = node_utils::chunk(new_leaf.key_hash, shift);

        if children.get(index).is_none() {
            children.set(index, Box::new(Node::Leaf(new_leaf)));
            return;
        }

        let child = match children.get_mut(index) {
            Some(child) => child,
            None => unreachable!(),
        };

        if let Node::Encoded(node) = child.as_ref() {
            let node = *node;
            let source_ref = source.expect("encoded node without a source");

            **child = encoded_utils::materialize(source_ref, node);
        }

        match child.as_mut() {
            Node::Leaf(leaf) if leaf.matches(&new_leaf.key, new_leaf.key_hash) => {
                leaf.value = new_leaf.value;
            }
            Node::Leaf(_) => {
                // The slot's leaf is a different key: push it one level down
                // and keep inserting below.  The chunks diverge eventually,
                // per the assert above.
                let old = mem::replace(child.as_mut(), Node::Interior(SparseArrayU32::new()));
                let old_leaf = match old {
                    Node::Leaf(leaf) => leaf,
                    _ => unreachable!(),
                };

                match child.as_mut() {
                    Node::Interior(subtrees) => {
                        subtrees.set(
                            node_utils::chunk(old_leaf.key_hash, shift + CHUNK_BITS),
                            Box::new(Node::Leaf(old_leaf)),
                        );
                    }
                    _ => unreachable!(),
                }

                child.insert(new_leaf, shift + CHUNK_BITS, source);
            }
            Node::Interior(_) => child.insert(new_leaf, shift + CHUNK_BITS, source),
            Node::Encoded(_) => unreachable!("the child was just materialized"),
        }
    }

    /// Returns `true` if the key was present.
    fn remove<Q: ?Sized, S>(
        &mut self,
        key: &Q,
        key_hash: HashValue,
        shift: u32,
        source: Option<&S>,
    ) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
        S: EncodedTree<K, V, Ref = R>,
    {
        assert!(shift + CHUNK_BITS < HASH_BITS);

        let children = match self {
            Node::Interior(children) => children,
            _ => unreachable!("removal descends through interior nodes"),
        };
        let index = node_utils::chunk(key_hash, shift);

        let remove_child = {
            let child = match children.get_mut(index) {
                Some(child) => child,
                None => return false,
            };

            if let Node::Encoded(node) = child.as_ref() {
                let node = *node;
                let source_ref = source.expect("encoded node without a source");

                // Only materialize when there is actually something to
                // remove; a miss must leave the tree untouched.
                if encoded_utils::get(source_ref, node, key, key_hash, shift + CHUNK_BITS)
                    .is_none()
                {
                    return false;
                }

                **child = encoded_utils::materialize(source_ref, node);
            }

            match child.as_mut() {
                Node::Leaf(leaf) => {
                    if !leaf.matches(key, key_hash) {
                        return false;
                    }

                    true
                }
                Node::Interior(_) => {
                    if !child.remove(key, key_hash, shift + CHUNK_BITS, source) {
                        return false;
                    }

                    // The child node may have lost its last leaf, in which
                    // case it gets removed as well.
                    match child.as_ref() {
                        Node::Interior(subtrees) => subtrees.is_empty(),
                        _ => unreachable!(),
                    }
                }
                Node::Encoded(_) => unreachable!("the child was just materialized"),
            }
        };

        if remove_child {
            children.remove(index);
        }

        true
    }

    fn is_leaf<S>(&self, source: Option<&S>) -> bool
    where
        S: EncodedTree<K, V, Ref = R>,
    {
        match self {
            Node::Leaf(_) => true,
            Node::Interior(_) => false,
            Node::Encoded(node) => {
                let source = source.expect("encoded node without a source");

                source.interior_bitmap(*node).is_none()
            }
        }
    }

    fn dump<S, W>(&self, source: Option<&S>, out: &mut W, indent: usize) -> io::Result<()>
    where
        S: EncodedTree<K, V, Ref = R>,
        W: io::Write,
    {
        match self {
            Node::Leaf(leaf) => write!(out, " {:08x}", leaf.key_hash),
            Node::Encoded(node) => {
                let source_ref = source.expect("encoded node without a source");

                encoded_utils::dump(source_ref, *node, out, indent)
            }
            Node::Interior(children) => {
                let total = children.size();
                let mut leaves = total;

                write!(out, "{:width$}{{", "", width = 2 * indent)?;

                for child in children.iter() {
                    if !child.is_leaf(source) {
                        leaves -= 1;
                        writeln!(out)?;
                        child.dump(source, out, indent + 1)?;
                    }
                }

                if leaves > 0 {
                    if leaves < total {
                        write!(out, "\n{:width$} ", "", width = 2 * indent)?;
                    }

                    for child in children.iter() {
                        if child.is_leaf(source) {
                            child.dump(source, out, indent)?;
                        }
                    }
                }

                write!(out, " }}")
            }
        }
    }

    fn write_to<S, E>(&self, source: Option<&S>, encoder: &mut E) -> E::Output
    where
        S: EncodedTree<K, V, Ref = R>,
        E: TreeEncoder<K, V, R>,
    {
        match self {
            Node::Leaf(leaf) => encoder.write_leaf(leaf.key_hash, &leaf.key, &leaf.value),
            Node::Encoded(node) => encoder.write_reused(*node),
            Node::Interior(children) => {
                let mut written: SmallBuffer<E::Output, DEGREE> = SmallBuffer::new();

                for child in children.iter() {
                    written.push_back(child.write_to(source, encoder));
                }

                encoder.write_interior(children.bitmap(), written.as_slice())
            }
        }
    }
}

impl<K, V> HashTree<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> HashTree<K, V> {
        HashTree::new_with_hasher(RandomState::new())
    }
}

impl<K, V, H: BuildHasher> HashTree<K, V, H>
where
    K: Eq + Hash,
{
    pub fn new_with_hasher(hasher_builder: H) -> HashTree<K, V, H> {
        HashTree { root: None, source: None, hasher_builder }
    }
}

impl<K, V, H: BuildHasher, S: EncodedTree<K, V>> HashTree<K, V, H, S>
where
    K: Eq + Hash,
{
    /// Wraps an immutable encoded tree.
    ///
    /// Reads resolve directly against the encoded data.  The first mutation
    /// materializes the path from the root to the mutation site; everything
    /// else stays encoded.  The encoded data must outlive the tree, which is
    /// why `S` is typically a shared reference into it.
    ///
    /// The hasher must produce the hashes stored in the encoded leaves, so
    /// `H` cannot be a randomized hasher state unless it is the exact
    /// instance the encoded tree was built with (see
    /// [`DefaultBuildHasher`](crate::utils::DefaultBuildHasher)).
    pub fn from_encoded(source: S) -> HashTree<K, V, H, S>
    where
        H: Default,
    {
        HashTree::from_encoded_with_hasher(source, H::default())
    }

    pub fn from_encoded_with_hasher(source: S, hasher_builder: H) -> HashTree<K, V, H, S> {
        HashTree { root: source.root().map(Node::Encoded), source: Some(source), hasher_builder }
    }

    /// Number of entries in the tree.  This walks the whole structure: Θ(n).
    pub fn count(&self) -> usize {
        match &self.root {
            None => 0,
            Some(root) => root.count(self.source.as_ref()),
        }
    }

    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let key_hash = node_utils::hash(key, &self.hasher_builder);

        self.root
            .as_ref()
            .and_then(|root| root.get(key, key_hash, 0, self.source.as_ref()))
    }

    pub fn contains_key<Q: ?Sized>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        match &self.root {
            None => true,
            Some(Node::Interior(children)) => children.is_empty(),
            Some(Node::Encoded(node)) => {
                let source = self.source.as_ref().expect("encoded node without a source");

                source.interior_bitmap(*node) == Some(0)
            }
            Some(Node::Leaf(_)) => unreachable!("the root is never a leaf"),
        }
    }

    /// Inserts the entry, overwriting the value of an existing `key`.
    pub fn insert(&mut self, key: K, value: V) {
        let key_hash = node_utils::hash(&key, &self.hasher_builder);

        self.materialize_root();

        let root = match self.root.as_mut() {
            Some(root) => root,
            None => unreachable!("the root was just materialized"),
        };

        root.insert(LeafNode { key_hash, key, value }, 0, self.source.as_ref());
    }

    /// Removes the entry for `key`.  Returns `true` if it was present.
    pub fn remove<Q: ?Sized>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let key_hash = node_utils::hash(key, &self.hasher_builder);

        match &self.root {
            None => return false,
            Some(Node::Encoded(node)) => {
                let node = *node;
                let source = self.source.as_ref().expect("encoded node without a source");

                // Wrapped and still untouched: materialize only when there
                // is actually something to remove.
                if encoded_utils::get(source, node, key, key_hash, 0).is_none() {
                    return false;
                }

                self.materialize_root();
            }
            Some(_) => (),
        }

        let root = match self.root.as_mut() {
            Some(root) => root,
            None => unreachable!(),
        };

        root.remove(key, key_hash, 0, self.source.as_ref())
    }

    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter::new(self)
    }

    pub fn keys(&self) -> IterKeys<'_, K, V, S> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> IterValues<'_, K, V, S> {
        self.iter().map(|(_, v)| v)
    }

    /// Writes a nested representation of the tree for debugging.  Leaves
    /// show their key hash; nodes still living in the encoded data are
    /// marked with `*`.  The format is not stable.
    pub fn dump<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "HashTree {{")?;

        if let Some(root) = &self.root {
            writeln!(out)?;
            root.dump(self.source.as_ref(), out, 1)?;
        }

        writeln!(out, "}}")
    }

    /// Hands the tree to `encoder`, children before parents.  Subtrees that
    /// still live in the encoded data are passed through
    /// [`TreeEncoder::write_reused`] so the encoder can emit a delta.
    /// Returns the encoder's output for the root; an empty tree is written
    /// as an interior node without children.
    pub fn write_to<E>(&self, encoder: &mut E) -> E::Output
    where
        E: TreeEncoder<K, V, S::Ref>,
    {
        match &self.root {
            None => encoder.write_interior(0, &[]),
            Some(root) => root.write_to(self.source.as_ref(), encoder),
        }
    }

    /// Creates the root if the tree is still empty, and replaces an encoded
    /// root by its materialized form.  Either way the root ends up with the
    /// full fan-out capacity.
    fn materialize_root(&mut self) {
        let encoded = match &self.root {
            None => None,
            Some(Node::Encoded(node)) => Some(*node),
            Some(_) => return,
        };

        let root = match encoded {
            None => Node::new_root(),
            Some(node) => {
                let source = self.source.as_ref().expect("encoded node without a source");
                let mut root = encoded_utils::materialize(source, node);

                match &mut root {
                    Node::Interior(children) => children.reserve(DEGREE),
                    _ => panic!("the encoded root is not an interior node"),
                }

                root
            }
        };

        self.root = Some(root);
    }
}

impl<'a, K, Q: ?Sized, V, H: BuildHasher, S: EncodedTree<K, V>> Index<&'a Q>
    for HashTree<K, V, H, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: Hash + Eq,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K, V, H: BuildHasher> Default for HashTree<K, V, H>
where
    K: Eq + Hash,
    H: Default,
{
    fn default() -> HashTree<K, V, H> {
        HashTree::new_with_hasher(H::default())
    }
}

impl<K, V: PartialEq, H: BuildHasher, S: EncodedTree<K, V>> PartialEq for HashTree<K, V, H, S>
where
    K: Eq + Hash,
{
    fn eq(&self, other: &HashTree<K, V, H, S>) -> bool {
        self.count() == other.count()
            && self.iter().all(|(key, value)| other.get(key).map_or(false, |v| *value == *v))
    }
}

impl<K, V: Eq, H: BuildHasher, S: EncodedTree<K, V>> Eq for HashTree<K, V, H, S> where K: Eq + Hash
{}

impl<K, V, H: BuildHasher, S: EncodedTree<K, V>> Display for HashTree<K, V, H, S>
where
    K: Eq + Hash + Display,
    V: Display,
{
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;

        fmt.write_str("{")?;

        for (k, v) in self.iter() {
            if !first {
                fmt.write_str(", ")?;
            }
            k.fmt(fmt)?;
            fmt.write_str(": ")?;
            v.fmt(fmt)?;
            first = false;
        }

        fmt.write_str("}")
    }
}

impl<'a, K, V, H: BuildHasher, S: EncodedTree<K, V>> IntoIterator for &'a HashTree<K, V, H, S>
where
    K: Eq + Hash,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Iter<'a, K, V, S> {
        self.iter()
    }
}

impl<K, V, H> FromIterator<(K, V)> for HashTree<K, V, H>
where
    K: Eq + Hash,
    H: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(into_iter: I) -> HashTree<K, V, H> {
        let mut tree = HashTree::new_with_hasher(Default::default());

        for (k, v) in into_iter {
            tree.insert(k, v);
        }

        tree
    }
}

pub type IterKeys<'a, K, V, S = NoSource> =
    std::iter::Map<Iter<'a, K, V, S>, fn((&'a K, &'a V)) -> &'a K>;
pub type IterValues<'a, K, V, S = NoSource> =
    std::iter::Map<Iter<'a, K, V, S>, fn((&'a K, &'a V)) -> &'a V>;

/// Iterator over the entries of a [`HashTree`], in unspecified order.
#[derive(Debug)]
pub struct Iter<'a, K, V, S: EncodedTree<K, V> = NoSource> {
    source: Option<&'a S>,
    stack: SmallBuffer<IterFrame<'a, K, V, S::Ref>, MAX_DEPTH>,
}

#[derive(Debug)]
enum IterFrame<'a, K, V, R> {
    Interior(slice::Iter<'a, Box<Node<K, V, R>>>),
    Encoded { node: R, next: usize, len: usize },
}

/// One child produced by the frame on top of the iteration stack.
enum Step<'a, K, V, R> {
    Child(&'a Node<K, V, R>),
    EncodedChild(R),
}

impl<'a, K, V, S: EncodedTree<K, V>> Iter<'a, K, V, S>
where
    K: Eq + Hash,
{
    fn new<H: BuildHasher>(tree: &'a HashTree<K, V, H, S>) -> Iter<'a, K, V, S> {
        let mut stack: SmallBuffer<IterFrame<'a, K, V, S::Ref>, MAX_DEPTH> = SmallBuffer::new();

        match &tree.root {
            None => (),
            Some(Node::Interior(children)) => {
                stack.push_back(IterFrame::Interior(children.iter()));
            }
            Some(Node::Encoded(node)) => {
                let source = tree.source.as_ref().expect("encoded node without a source");
                let bitmap = source
                    .interior_bitmap(*node)
                    .expect("the encoded root is not an interior node");

                stack.push_back(IterFrame::Encoded {
                    node: *node,
                    next: 0,
                    len: bitmap.count_ones() as usize,
                });
            }
            Some(Node::Leaf(_)) => unreachable!("the root is never a leaf"),
        }

        Iter { source: tree.source.as_ref(), stack }
    }

    fn enter_encoded(&mut self, node: S::Ref) -> Option<(&'a K, &'a V)> {
        let source = self.source.expect("encoded node without a source");

        match source.interior_bitmap(node) {
            Some(bitmap) => {
                self.stack.push_back(IterFrame::Encoded {
                    node,
                    next: 0,
                    len: bitmap.count_ones() as usize,
                });

                None
            }
            None => Some((source.leaf_key(node), source.leaf_value(node))),
        }
    }
}

impl<'a, K, V, S: EncodedTree<K, V>> Iterator for Iter<'a, K, V, S>
where
    K: Eq + Hash,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        loop {
            if self.stack.is_empty() {
                return None;
            }

            let step = {
                let source = self.source;

                match self.stack.back_mut() {
                    IterFrame::Interior(children) => {
                        children.next().map(|child| Step::Child(&**child))
                    }
                    IterFrame::Encoded { node, next, len } => {
                        if *next < *len {
                            let source = source.expect("encoded node without a source");
                            let child = source.child(*node, *next);

                            *next += 1;

                            Some(Step::EncodedChild(child))
                        } else {
                            None
                        }
                    }
                }
            };

            match step {
                None => {
                    self.stack.pop_back();
                }
                Some(Step::Child(node)) => match node {
                    Node::Leaf(leaf) => return Some((&leaf.key, &leaf.value)),
                    Node::Interior(children) => {
                        self.stack.push_back(IterFrame::Interior(children.iter()));
                    }
                    Node::Encoded(encoded) => {
                        if let Some(entry) = self.enter_encoded(*encoded) {
                            return Some(entry);
                        }
                    }
                },
                Some(Step::EncodedChild(node)) => {
                    if let Some(entry) = self.enter_encoded(node) {
                        return Some(entry);
                    }
                }
            }
        }
    }
}

#[cfg(feature = "serde")]
pub mod serde {
    use super::*;
    use ::serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
    use ::serde::ser::{Serialize, Serializer};
    use std::marker::PhantomData;

    impl<K, V, H, S> Serialize for HashTree<K, V, H, S>
    where
        K: Eq + Hash + Serialize,
        V: Serialize,
        H: BuildHasher,
        S: EncodedTree<K, V>,
    {
        fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
            serializer.collect_map(self.iter())
        }
    }

    impl<'de, K, V, H> Deserialize<'de> for HashTree<K, V, H>
    where
        K: Eq + Hash + Deserialize<'de>,
        V: Deserialize<'de>,
        H: BuildHasher + Default,
    {
        fn deserialize<D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<HashTree<K, V, H>, D::Error> {
            deserializer.deserialize_map(HashTreeVisitor { phantom: PhantomData })
        }
    }

    struct HashTreeVisitor<K, V, H> {
        phantom: PhantomData<(K, V, H)>,
    }

    impl<'de, K, V, H> Visitor<'de> for HashTreeVisitor<K, V, H>
    where
        K: Eq + Hash + Deserialize<'de>,
        V: Deserialize<'de>,
        H: BuildHasher + Default,
    {
        type Value = HashTree<K, V, H>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a map")
        }

        fn visit_map<A>(self, mut map: A) -> Result<HashTree<K, V, H>, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut tree = HashTree::new_with_hasher(Default::default());

            while let Some((k, v)) = map.next_entry()? {
                tree.insert(k, v);
            }

            Ok(tree)
        }
    }
}
