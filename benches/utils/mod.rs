/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use bencher::Bencher;

pub trait BencherNoDrop {
    /// Runs `inner` while keeping its return values alive, so that their
    /// drop time stays out of the measurement.
    fn iter_no_drop<T, F>(&mut self, inner: F)
    where
        F: FnMut() -> T;
}

impl BencherNoDrop for Bencher {
    fn iter_no_drop<T, F>(&mut self, mut inner: F)
    where
        F: FnMut() -> T,
    {
        let mut keep_alive = Vec::with_capacity(1_000_000);
        let initial_capacity = keep_alive.capacity();

        self.iter(|| keep_alive.push(inner()));

        assert_eq!(
            initial_capacity,
            keep_alive.capacity(),
            "the keep-alive vector was resized, which may have distorted the measurement"
        );
    }
}

/// Caps benchmark sizes when `QUICK_BENCH=true`, so CI can check that the
/// benchmarks still run without paying for the full iteration counts.
pub fn iterations(n: usize) -> usize {
    match std::env::var("QUICK_BENCH") {
        Ok(ref v) if v == "true" => 2,
        _ => n,
    }
}
