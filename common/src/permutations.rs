//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use rand::rngs::OsRng;
use rand::seq::SliceRandom;

/// Returns a uniformly random permutation of `0..n`
///
/// `(0 1 2 3) -> (2 3 0 1)`
///
/// Indices are shuffled with Fisher-Yates driven by `OsRng`, so the
/// pattern can be used to hide the order in which items were produced.
pub fn gen_permute_pattern(n: usize) -> Vec<usize> {
    let mut res: Vec<usize> = (0..n).collect::<Vec<usize>>();
    res.shuffle(&mut OsRng);
    res
}

/// Applies the permutation on a vector _in place_
///
/// Item at index `i` moves to index `permutation[i]`.
///
/// # Example
///
/// ```
/// use common::permutations;
/// let mut v = vec!['a', 'b', 'c'];
/// let p = vec![2, 1, 0];
///
/// permutations::permute(&p, &mut v);
/// assert_eq!(v[0], 'c');
/// assert_eq!(v[1], 'b');
/// assert_eq!(v[2], 'a');
/// ```
pub fn permute<T>(permutation: &[usize], items: &mut Vec<T>) {
    assert_eq!(
        permutation.len(),
        items.len(),
        "permutation should have the same size as the items"
    );
    let mut slots: Vec<Option<T>> = (0..items.len()).map(|_| None).collect();
    for (item, &target) in items.drain(..).zip(permutation.iter()) {
        slots[target] = Some(item);
    }
    items.extend(slots.into_iter().flatten());
}

/// Un-Applies the permutation on a vector _in place_
///
/// # Example
///
/// ```
/// use common::permutations;
/// let mut v = vec!['c', 'b', 'a'];
/// let p = vec![2, 1, 0];
///
/// permutations::undo_permute(&p, &mut v);
/// assert_eq!(v[0], 'a');
/// assert_eq!(v[1], 'b');
/// assert_eq!(v[2], 'c');
/// ```
pub fn undo_permute<T>(permutation: &[usize], items: &mut Vec<T>) {
    assert_eq!(
        permutation.len(),
        items.len(),
        "permutation should have the same size as the items"
    );
    let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
    items.extend(permutation.iter().filter_map(|&source| slots[source].take()));
}

/// Shuffles the items with a fresh random permutation
pub fn shuffle<T>(items: &mut Vec<T>) {
    let permutation = gen_permute_pattern(items.len());
    permute(&permutation, items);
}

#[cfg(test)]
mod tests {
    use super::*;
    const NUM_TEST_ITERATIONS: i32 = 100;

    #[test]
    fn check_permutation() {
        const N: usize = 50;
        let even: Vec<usize> = (0..N).collect();
        for _ in 0..NUM_TEST_ITERATIONS {
            let p = gen_permute_pattern(N);
            assert_ne!(p, even);

            let mut sorted = p.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, even);
        }
    }

    #[test]
    fn check_degenerate_sizes() {
        assert!(gen_permute_pattern(0).is_empty());
        assert_eq!(gen_permute_pattern(1), vec![0]);

        let mut empty: Vec<u8> = vec![];
        shuffle(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn permute_and_undo_permutation() {
        let v = vec!['a', 'b', 'c', 'd'];
        let p = vec![1, 0, 3, 2];

        let mut a = v.to_vec();
        permute(&p, &mut a);
        assert_eq!(a, vec!['b', 'a', 'd', 'c']);

        undo_permute(&p, &mut a);
        assert_eq!(a, v);
    }

    #[test]
    fn permute_and_undo_random_permutation() {
        const N: usize = 100;
        let v: Vec<usize> = (0..N).collect();
        for _ in 0..NUM_TEST_ITERATIONS {
            let p = gen_permute_pattern(N);

            let mut a = v.to_vec();
            permute(&p, &mut a);
            assert_ne!(a, v);

            undo_permute(&p, &mut a);
            assert_eq!(a, v);
        }
    }

    #[test]
    fn shuffle_keeps_items() {
        let v: Vec<String> = (0..64).map(|i| i.to_string()).collect();
        let mut a = v.clone();
        shuffle(&mut a);
        assert_ne!(a, v);
        a.sort_by_key(|s| s.parse::<usize>().unwrap());
        assert_eq!(a, v);
    }
}
