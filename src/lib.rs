/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

#![cfg_attr(feature = "fatal-warnings", deny(warnings))]

//! # doctrie
//!
//! The in-memory index layer of a document-serialization stack: a mutable
//! [hash array mapped trie](https://en.wikipedia.org/wiki/Hash_array_mapped_trie)
//! whose node layout is compact enough that a serializer can write it out as a
//! persistent tree and append deltas without rewriting unchanged subtrees.
//!
//! # Data Structures
//!
//! This crate implements the following data structures:
//!
//!   1. [`HashTree`](#hashtree)
//!   2. [`SmallBuffer`](#smallbuffer)
//!
//! ## `HashTree`
//!
//! A mutable key→value mapping backed by a hash array mapped trie.  Interior
//! nodes hold a 32-bit slot bitmap plus a compacted child array, so a node
//! with three children costs three slots.  A tree can also wrap a previously
//! serialized tree (see [`EncodedTree`](tree/hash_tree/trait.EncodedTree.html)):
//! reads go straight to the encoded data, and the first mutation materializes
//! only the path from the root to the mutation site.
//!
//! ### Example
//!
//! ```rust
//! use doctrie::HashTree;
//!
//! let mut index = HashTree::new();
//!
//! index.insert("title", 7);
//! index.insert("body", 12);
//!
//! assert_eq!(index.get(&"title"), Some(&7));
//! assert_eq!(index.count(), 2);
//!
//! assert!(index.remove(&"title"));
//! assert_eq!(index.get(&"title"), None);
//! assert_eq!(index.count(), 1);
//! ```
//!
//! ## `SmallBuffer`
//!
//! A sequence with an inline capacity of `N` elements.  It only touches the
//! heap once it grows past `N`, which makes it suitable for the small child
//! arrays of trie nodes and for transient work buffers during tree rewrites.
//!
//! ### Example
//!
//! ```rust
//! use doctrie::SmallBuffer;
//!
//! let mut buffer: SmallBuffer<i32, 4> = SmallBuffer::new();
//!
//! buffer.push_back(1);
//! buffer.push_back(2);
//!
//! assert_eq!(buffer.len(), 2);
//! assert_eq!(buffer[0], 1);
//! ```

pub mod sequence;
pub mod tree;
pub mod utils;

pub use crate::sequence::small_buffer::SmallBuffer;
pub use crate::tree::hash_tree::{EncodedTree, HashTree, HashValue, NoSource, TreeEncoder};
