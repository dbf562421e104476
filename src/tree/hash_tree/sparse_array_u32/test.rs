/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_new() {
    let empty_array: SparseArrayU32<u32> = SparseArrayU32::new();

    assert_eq!(empty_array.bitmap, 0);
    assert_eq!(empty_array.size(), 0);
    assert_eq!(
        empty_array.capacity(),
        INLINE_SLOTS,
        "small nodes must not allocate for their children"
    );
}

#[test]
fn test_set() {
    let mut array = SparseArrayU32::new();

    assert_eq!(array.size(), 0);
    assert_eq!(array.get(0), None);
    assert_eq!(array.get(SLOT_COUNT - 1), None);

    array.set(3, 'a');
    assert_eq!(array.size(), 1);

    assert_eq!(array.get(2), None);
    assert_eq!(array.get(3), Some(&'a'));
    assert_eq!(array.get(4), None);

    array.set(SLOT_COUNT - 4, 'b');
    assert_eq!(array.size(), 2);

    assert_eq!(array.get(3), Some(&'a'));
    assert_eq!(array.get(SLOT_COUNT - 4), Some(&'b'));

    array.set(3, 'c');
    assert_eq!(array.size(), 2);

    assert_eq!(array.get(3), Some(&'c'));
    assert_eq!(array.get(SLOT_COUNT - 4), Some(&'b'));
}

#[test]
fn test_set_keeps_slot_order() {
    let mut array = SparseArrayU32::new();

    array.set(9, 'c');
    array.set(2, 'a');
    array.set(31, 'd');
    array.set(5, 'b');

    assert_eq!(array.iter().copied().collect::<Vec<_>>(), ['a', 'b', 'c', 'd']);
}

#[test]
fn test_grows_one_slot_at_a_time() {
    let mut array = SparseArrayU32::new();

    for i in 0..INLINE_SLOTS {
        array.set(2 * i, i);
    }

    assert_eq!(array.capacity(), INLINE_SLOTS);

    for i in INLINE_SLOTS..8 {
        array.set(2 * i, i);

        assert_eq!(array.capacity(), i + 1);
    }
}

#[test]
fn test_remove() {
    let mut array = SparseArrayU32::new();

    array.set(3, 'a');
    array.set(SLOT_COUNT - 4, 'b');

    assert_eq!(array.remove(8), None);

    assert_eq!(array.get(3), Some(&'a'));
    assert_eq!(array.get(SLOT_COUNT - 4), Some(&'b'));
    assert_eq!(array.size(), 2);

    assert_eq!(array.remove(3), Some('a'));

    assert_eq!(array.get(3), None);
    assert_eq!(array.get(SLOT_COUNT - 4), Some(&'b'));
    assert_eq!(array.size(), 1);

    assert_eq!(array.remove(SLOT_COUNT - 4), Some('b'));

    assert_eq!(array.get(3), None);
    assert_eq!(array.get(SLOT_COUNT - 4), None);
    assert_eq!(array.size(), 0);
    assert!(array.is_empty());
}

#[test]
fn test_remove_keeps_capacity() {
    let mut array = SparseArrayU32::new();

    for i in 0..6 {
        array.set(i, i);
    }

    let capacity = array.capacity();

    array.remove(0);
    array.remove(3);

    assert_eq!(array.size(), 4);
    assert_eq!(array.capacity(), capacity);
}

#[test]
fn test_get_mut() {
    let mut array = SparseArrayU32::new();

    array.set(7, 10);

    assert_eq!(array.get_mut(6), None);

    *array.get_mut(7).unwrap() += 1;

    assert_eq!(array.get(7), Some(&11));
}

#[test]
fn test_reserve() {
    let mut array: SparseArrayU32<u32> = SparseArrayU32::new();

    array.reserve(SLOT_COUNT);

    assert_eq!(array.capacity(), SLOT_COUNT);
    assert_eq!(array.size(), 0);
}

#[test]
fn test_map_index() {
    use sparse_array_u32_utils::map_index;

    for i in 0..SLOT_COUNT {
        assert_eq!(map_index(0, i), None);
    }

    let bitmap: u32 = 0b_1110_0100_0101;

    assert_eq!(map_index(bitmap, 0), Some(0));
    assert_eq!(map_index(bitmap, 1), None);
    assert_eq!(map_index(bitmap, 2), Some(1));
    assert_eq!(map_index(bitmap, 3), None);

    assert_eq!(map_index(bitmap, 4), None);
    assert_eq!(map_index(bitmap, 5), None);
    assert_eq!(map_index(bitmap, 6), Some(2));
    assert_eq!(map_index(bitmap, 7), None);

    assert_eq!(map_index(bitmap, 8), None);
    assert_eq!(map_index(bitmap, 9), Some(3));
    assert_eq!(map_index(bitmap, 10), Some(4));
    assert_eq!(map_index(bitmap, 11), Some(5));

    assert_eq!(map_index(bitmap, 12), None);
}
