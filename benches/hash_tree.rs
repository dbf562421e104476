/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

#![cfg_attr(feature = "fatal-warnings", deny(warnings))]

#[macro_use]
extern crate bencher;

mod utils;

use bencher::{black_box, Bencher};
use doctrie::HashTree;
use utils::iterations;
use utils::BencherNoDrop;

fn hash_tree_insert(bench: &mut Bencher) {
    let limit = iterations(100_000);

    bench.iter_no_drop(|| {
        let mut tree = HashTree::new();

        for i in 0..limit {
            tree.insert(i, -(i as isize));
        }

        tree
    });
}

fn hash_tree_insert_remove(bench: &mut Bencher) {
    let limit = iterations(100_000);

    bench.iter_no_drop(|| {
        let mut tree = HashTree::new();

        for i in 0..limit {
            tree.insert(i, -(i as isize));
        }

        for i in 0..limit {
            tree.remove(&i);
        }

        tree
    });
}

fn hash_tree_get(bench: &mut Bencher) {
    let limit = iterations(100_000);
    let mut tree = HashTree::new();

    for i in 0..limit {
        tree.insert(i, -(i as isize));
    }

    bench.iter(|| {
        for i in 0..limit {
            black_box(tree.get(&i));
        }
    });
}

fn hash_tree_count(bench: &mut Bencher) {
    let limit = iterations(100_000);
    let mut tree = HashTree::new();

    for i in 0..limit {
        tree.insert(i, -(i as isize));
    }

    bench.iter(|| {
        black_box(tree.count());
    });
}

fn hash_tree_iterate(bench: &mut Bencher) {
    let limit = iterations(100_000);
    let mut tree = HashTree::new();

    for i in 0..limit {
        tree.insert(i, -(i as isize));
    }

    bench.iter(|| {
        for kv in tree.iter() {
            black_box(kv);
        }
    });
}

benchmark_group!(
    benches,
    hash_tree_insert,
    hash_tree_insert_remove,
    hash_tree_get,
    hash_tree_count,
    hash_tree_iterate
);
benchmark_main!(benches);
