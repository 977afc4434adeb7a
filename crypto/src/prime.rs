//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use num_bigint::BigUint;
use num_bigint::RandBigInt;
use num_integer::Integer;
use num_traits::identities::Zero;
use num_traits::One;
use rand::rngs::OsRng;

const SMALL_PRIMES: [u32; 24] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Error probability is at most 4^-rounds for a composite candidate
const MILLER_RABIN_ROUNDS: usize = 40;

/// Samples a random prime of exactly `bit_size` bits
///
/// The two top bits are forced, so the product of two such primes
/// always has `2 * bit_size` bits.
pub fn sample_prime(bit_size: u64) -> BigUint {
    assert!(bit_size >= 16, "prime size {} is too small", bit_size);

    let mut rng = OsRng;
    let top = BigUint::from(3u8) << (bit_size - 2);
    loop {
        let candidate = rng.gen_biguint(bit_size) | &top | BigUint::one();
        if is_probable_prime(&candidate, MILLER_RABIN_ROUNDS) {
            return candidate;
        }
    }
}

/// Trial division by small primes followed by Miller-Rabin
pub fn is_probable_prime(n: &BigUint, rounds: usize) -> bool {
    let two = BigUint::from(2u8);
    if n < &two {
        return false;
    }
    if n.is_even() {
        return n == &two;
    }
    for p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if n == &p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    let n_1 = n - 1u32;
    let s = n_1.trailing_zeros().unwrap_or(0);
    let d = &n_1 >> s;

    let mut rng = OsRng;
    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_1);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_1 {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
