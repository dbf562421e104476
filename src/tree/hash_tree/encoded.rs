/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use super::HashValue;
use std::convert::Infallible;
use std::fmt::Debug;

/// Read-only view over the serialized, immutable form of a hash tree.
///
/// A [`HashTree`](super::HashTree) constructed with
/// [`from_encoded`](super::HashTree::from_encoded) resolves lookups through
/// this trait without copying anything, and materializes an encoded node into
/// its mutable form only when a mutation reaches it.  The encoded data itself
/// is owned outside the tree, so implementations are typically shared
/// references into it.
///
/// Leaf hashes stored in the encoded data must agree with the hasher the
/// wrapping tree is given, or lookups will miss.
pub trait EncodedTree<K, V> {
    /// Cheap handle to a node within the encoded data, typically an offset.
    type Ref: Copy + Debug;

    /// The encoded root, or `None` when the encoded tree is empty.  The root
    /// is always an interior node.
    fn root(&self) -> Option<Self::Ref>;

    /// The slot bitmap of an interior node, or `None` when `node` is a leaf.
    fn interior_bitmap(&self, node: Self::Ref) -> Option<u32>;

    /// The child at `index` in the compacted child array of an interior node.
    fn child(&self, node: Self::Ref, index: usize) -> Self::Ref;

    /// The stored hash of a leaf's key.
    fn leaf_hash(&self, node: Self::Ref) -> HashValue;

    /// The key of a leaf.
    fn leaf_key(&self, node: Self::Ref) -> &K;

    /// The value of a leaf.
    fn leaf_value(&self, node: Self::Ref) -> &V;

    /// An owned copy of a leaf, taken when a mutation reaches encoded data.
    fn leaf_entry(&self, node: Self::Ref) -> (HashValue, K, V);
}

/// The encoded source of a tree built purely in memory.  Its `Ref` type is
/// uninhabited, so such a tree statically contains no encoded nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoSource;

impl<K, V> EncodedTree<K, V> for NoSource {
    type Ref = Infallible;

    fn root(&self) -> Option<Infallible> {
        None
    }

    fn interior_bitmap(&self, node: Infallible) -> Option<u32> {
        match node {}
    }

    fn child(&self, node: Infallible, _index: usize) -> Infallible {
        match node {}
    }

    fn leaf_hash(&self, node: Infallible) -> HashValue {
        match node {}
    }

    fn leaf_key(&self, node: Infallible) -> &K {
        match node {}
    }

    fn leaf_value(&self, node: Infallible) -> &V {
        match node {}
    }

    fn leaf_entry(&self, node: Infallible) -> (HashValue, K, V) {
        match node {}
    }
}

/// Sink for serializing a tree, fed by
/// [`HashTree::write_to`](super::HashTree::write_to).
///
/// Nodes arrive bottom-up: the children of an interior node are written
/// before the node itself, so an encoder emitting a flat byte stream can
/// reference children by offset.  `R` is the encoded-node handle of the
/// tree's source; a subtree that was never touched since the tree was loaded
/// is handed over as [`write_reused`](TreeEncoder::write_reused), which lets
/// the encoder append a delta that points back into the already-encoded data
/// instead of rewriting the subtree.
pub trait TreeEncoder<K, V, R> {
    /// Handle the encoder associates with a written node, typically an
    /// offset into the output.
    type Output;

    /// A leaf with its stored key hash.
    fn write_leaf(&mut self, key_hash: HashValue, key: &K, value: &V) -> Self::Output;

    /// An interior node; `children` holds the outputs of its children in
    /// compacted slot order.
    fn write_interior(&mut self, bitmap: u32, children: &[Self::Output]) -> Self::Output;

    /// A subtree living in the encoded data that was never mutated.
    fn write_reused(&mut self, node: R) -> Self::Output;
}
