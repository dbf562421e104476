/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use std::collections::hash_map::DefaultHasher;
use std::hash::BuildHasherDefault;

/// A hasher builder whose instances all hash identically within a process.
/// Use this instead of `RandomState` when the same hashes must be recomputed
/// later against encoded data (see
/// [`HashTree::from_encoded`](crate::HashTree::from_encoded)).
pub type DefaultBuildHasher = BuildHasherDefault<DefaultHasher>;
