//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use num_bigint::BigInt;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::identities::Zero;
use num_traits::One;

/// Inverse of `m` modulo `n`, if `m` is a unit
pub fn mod_inverse(m: &BigUint, n: &BigUint) -> Option<BigUint> {
    if n.is_zero() {
        return None;
    }
    let m_i = BigInt::from(m.clone());
    let n_i = BigInt::from(n.clone());
    let egcd = m_i.extended_gcd(&n_i);

    if !egcd.gcd.is_one() {
        return None;
    }
    egcd.x.mod_floor(&n_i).to_biguint()
}

pub fn is_coprime(a: &BigUint, b: &BigUint) -> bool {
    a.gcd(b).is_one()
}
