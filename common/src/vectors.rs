//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::collections::HashSet;
use std::hash::Hash;

use rayon::prelude::ParallelSliceMut;

/// Mask of 0 or 1 if item in a is in b
pub fn vec_intersection_mask<T>(a: &[T], b: &[T]) -> Vec<bool>
where
    T: Hash + Eq,
{
    let s: HashSet<&T> = b.iter().collect();
    a.iter().map(|e| s.contains(e)).collect::<Vec<bool>>()
}

/// Returns a vector with elements for which the corresponding element
/// in mask is set to true
pub fn apply_mask<T>(mask: &[bool], v: Vec<T>) -> Vec<T> {
    assert_eq!(
        mask.len(),
        v.len(),
        "masked vectors should have the same shape"
    );
    v.into_iter()
        .zip(mask.iter())
        .filter(|(_, &b)| b)
        .map(|(e, _)| e)
        .collect::<Vec<T>>()
}

/// De-duplicates the slice in place
/// the vector becomes sorted.
///
/// The alg switches to parallel implementation for
/// sizes larger than 1M records when `allow_parallel` flag is set
///
/// ## Example
///
/// ```
/// use common::vectors;
///
/// let mut v = vec![1, 2, 3, 1, 1];
/// vectors::dedup_unstable(&mut v, true);
///
/// assert_eq!(v, vec![1, 2, 3]);
/// ```
pub fn dedup_unstable<T>(v: &mut Vec<T>, allow_parallel: bool)
where
    T: Ord + Send,
{
    const LARGE_INPUT: usize = 1000000;
    if !allow_parallel || v.len() < LARGE_INPUT {
        debug!("Using sequential implementation of the vector");
        v.sort_unstable()
    } else {
        debug!("Using parallel implementation of the vector");
        v.par_sort_unstable();
    }
    v.dedup();
}

/// De-duplicates key-value pairs by key, the last value for a key wins
///
/// Keys keep the position of their first occurrence.
/// Returns the pairs and the number of dropped entries.
///
/// ## Example
///
/// ```
/// use common::vectors;
///
/// let v = vec![("a", 1), ("b", 2), ("a", 3)];
/// let (pairs, dropped) = vectors::dedup_by_key_last(v);
///
/// assert_eq!(pairs, vec![("a", 3), ("b", 2)]);
/// assert_eq!(dropped, 1);
/// ```
pub fn dedup_by_key_last<K, V>(pairs: Vec<(K, V)>) -> (Vec<(K, V)>, usize)
where
    K: Hash + Eq + Clone,
{
    let total = pairs.len();
    let mut index: HashMap<K, usize> = HashMap::with_capacity(total);
    let mut res: Vec<(K, V)> = Vec::with_capacity(total);

    for (k, v) in pairs {
        match index.get(&k) {
            Some(&i) => res[i].1 = v,
            None => {
                index.insert(k.clone(), res.len());
                res.push((k, v));
            }
        }
    }
    let dropped = total - res.len();
    (res, dropped)
}
