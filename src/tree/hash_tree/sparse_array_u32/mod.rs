/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use crate::sequence::small_buffer::SmallBuffer;
use std::slice;

/// Slots of a fully populated array.
const SLOT_COUNT: usize = u32::BITS as usize;

/// Number of child slots kept within the array itself.  Interior nodes of a
/// hash tree rarely hold more than a handful of children, so this covers the
/// common case without a heap allocation.
const INLINE_SLOTS: usize = 4;

/// Sparse array of 32 slots.  The space used is proportional to the number of
/// slots set: entry *i* of the backing buffer belongs to the *i*-th set bit
/// of `bitmap`.
#[derive(Debug, PartialEq, Eq)]
pub struct SparseArrayU32<T> {
    bitmap: u32,
    array: SmallBuffer<T, INLINE_SLOTS>,
}

pub mod sparse_array_u32_utils {
    /// Maps a virtual slot index to the index within the compacted array.
    /// `None` when the slot is empty.
    #[inline]
    pub fn map_index(bitmap: u32, virtual_index: usize) -> Option<usize> {
        if bitmap & (1u32 << virtual_index) == 0 {
            None
        } else {
            let mask = (1u32 << virtual_index) - 1;

            Some((bitmap & mask).count_ones() as usize)
        }
    }
}

impl<T> SparseArrayU32<T> {
    pub fn new() -> SparseArrayU32<T> {
        SparseArrayU32 { bitmap: 0, array: SmallBuffer::new() }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        debug_assert!(index < SLOT_COUNT);

        sparse_array_u32_utils::map_index(self.bitmap, index).map(|i| self.array.get(i))
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        debug_assert!(index < SLOT_COUNT);

        sparse_array_u32_utils::map_index(self.bitmap, index).map(move |i| self.array.get_mut(i))
    }

    /// Stores `value` in slot `index`, replacing any previous value there.
    pub fn set(&mut self, index: usize, value: T) -> &mut T {
        debug_assert!(index < SLOT_COUNT);

        match sparse_array_u32_utils::map_index(self.bitmap, index) {
            Some(i) => {
                let slot = self.array.get_mut(i);
                *slot = value;
                slot
            }
            None => {
                if self.array.len() == self.array.capacity() {
                    // Grow one slot at a time: a node stays exactly as wide
                    // as its current child count needs.
                    self.array.reserve(self.array.len() + 1);
                }

                self.bitmap |= 1u32 << index;

                let i = sparse_array_u32_utils::map_index(self.bitmap, index)
                    .expect("bit was just set");

                self.array.insert(i, value)
            }
        }
    }

    /// Clears slot `index`, returning its value if it was set.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        debug_assert!(index < SLOT_COUNT);

        sparse_array_u32_utils::map_index(self.bitmap, index).map(|i| {
            self.bitmap ^= 1u32 << index;
            self.array.remove(i)
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.bitmap.count_ones() as usize
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.array.capacity()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitmap == 0
    }

    #[inline]
    pub fn bitmap(&self) -> u32 {
        self.bitmap
    }

    pub fn reserve(&mut self, capacity: usize) {
        self.array.reserve(capacity);
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.array.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.array.iter_mut()
    }
}

#[cfg(test)]
mod test;
