//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::fmt::Error;
use std::fmt::Formatter;

use rand::rngs::OsRng;
use rand::RngCore;
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use sha2::Sha512;

use crate::error::CryptoError;
use crate::error::Result;
use crate::prelude::GroupElement;
use crate::prelude::RistrettoPoint;
use crate::prelude::Scalar;

/// Batch blinding operations over the Ristretto group
///
/// The trait aims to interface sequential and parallel implementations.
/// Both keep the order of their input; shuffling is left to the caller.
///
/// Blinding is `H(x) * k`, and since scalar multiplication commutes,
/// `(H(x) * a) * b == (H(x) * b) * a`. The intersection step of the
/// protocol relies on exactly this.
///
/// Actual EC curve operations are driven by [Dalek](https://doc.dalek.rs/curve25519_dalek/index.html)
pub trait ECCipher {
    type Item;

    /// Mapping plain text to EC Curve using Sha512
    fn hash(&self, plaintext: &[String]) -> Vec<Self::Item>;

    /// Mapping plain text to EC Curve using Sha512
    /// and exponentiating the point to `key` power
    fn hash_encrypt(&self, plaintext: &[String], key: &Scalar) -> Result<Vec<Self::Item>>;

    /// Given the points on a curve, exponentiates them to the power `pow`
    fn encrypt(&self, points: &[Self::Item], pow: &Scalar) -> Result<Vec<Self::Item>>;

    /// Serializes the points to their canonical encoding
    fn to_elements(&self, points: &[Self::Item]) -> Vec<GroupElement>;

    /// Deserializes the points
    fn to_points(&self, payload: &[GroupElement]) -> Result<Vec<Self::Item>>;

    /// Deserializes the points and exponentiates them after that
    fn to_points_encrypt(
        &self,
        payload: &[GroupElement],
        pow: &Scalar,
    ) -> Result<Vec<Self::Item>>;

    /// Hash, exponentiate and serialize in one pass
    fn hash_encrypt_to_elements(
        &self,
        plaintext: &[String],
        key: &Scalar,
    ) -> Result<Vec<GroupElement>>;

    /// Re-blinds already serialized points
    fn encrypt_elements(
        &self,
        payload: &[GroupElement],
        pow: &Scalar,
    ) -> Result<Vec<GroupElement>>;
}

/// Sequential impl of `ECCipher`
///
/// All transformations are single-threaded
#[derive(Default)]
pub struct ECRistrettoSequential {}

impl ECRistrettoSequential {
    pub fn new() -> ECRistrettoSequential {
        ECRistrettoSequential {}
    }
}

impl ECCipher for ECRistrettoSequential {
    type Item = RistrettoPoint;

    fn hash(&self, plaintext: &[String]) -> Vec<Self::Item> {
        plaintext
            .iter()
            .map(|text| hash_to_point(text.as_bytes()))
            .collect::<Vec<Self::Item>>()
    }

    fn hash_encrypt(&self, plaintext: &[String], key: &Scalar) -> Result<Vec<Self::Item>> {
        check_scalar(key)?;
        Ok(plaintext
            .iter()
            .map(|text| hash_to_point(text.as_bytes()) * key)
            .collect::<Vec<Self::Item>>())
    }

    fn encrypt(&self, points: &[Self::Item], pow: &Scalar) -> Result<Vec<Self::Item>> {
        check_scalar(pow)?;
        Ok(points.iter().map(|p| p * pow).collect::<Vec<Self::Item>>())
    }

    fn to_elements(&self, points: &[Self::Item]) -> Vec<GroupElement> {
        points
            .iter()
            .map(GroupElement::from_point)
            .collect::<Vec<_>>()
    }

    fn to_points(&self, payload: &[GroupElement]) -> Result<Vec<Self::Item>> {
        payload
            .iter()
            .map(|e| e.to_point())
            .collect::<Result<Vec<_>>>()
    }

    fn to_points_encrypt(
        &self,
        payload: &[GroupElement],
        pow: &Scalar,
    ) -> Result<Vec<Self::Item>> {
        check_scalar(pow)?;
        payload
            .iter()
            .map(|e| e.to_point().map(|p| p * pow))
            .collect::<Result<Vec<_>>>()
    }

    fn hash_encrypt_to_elements(
        &self,
        plaintext: &[String],
        key: &Scalar,
    ) -> Result<Vec<GroupElement>> {
        check_scalar(key)?;
        Ok(plaintext
            .iter()
            .map(|text| GroupElement::from_point(&(hash_to_point(text.as_bytes()) * key)))
            .collect::<Vec<_>>())
    }

    fn encrypt_elements(
        &self,
        payload: &[GroupElement],
        pow: &Scalar,
    ) -> Result<Vec<GroupElement>> {
        check_scalar(pow)?;
        payload
            .iter()
            .map(|e| point_multiply(e, pow))
            .collect::<Result<Vec<_>>>()
    }
}

/// Parallel impl of `ECCipher`
///
/// Multithreaded component happens via `rayon` crate. Every item is
/// blinded independently, so the batch splits across the pool without
/// any coordination and the output order still matches the input.
///
/// # Example
///
/// ```
/// use crypto::eccipher::{gen_scalar, ECCipher, ECRistrettoParallel};
///
/// let (a, b) = (gen_scalar(), gen_scalar());
/// let eccipher = ECRistrettoParallel::default();
///
/// let text = vec!["a", "b", "c"]
///     .iter()
///     .map(|x| String::from(*x))
///     .collect::<Vec<_>>();
///
/// let ab = eccipher
///     .encrypt_elements(&eccipher.hash_encrypt_to_elements(&text, &a).unwrap(), &b)
///     .unwrap();
/// let ba = eccipher
///     .encrypt_elements(&eccipher.hash_encrypt_to_elements(&text, &b).unwrap(), &a)
///     .unwrap();
/// assert_eq!(ab, ba);
/// ```
#[derive(Default)]
pub struct ECRistrettoParallel {}

impl ECRistrettoParallel {
    pub fn new() -> ECRistrettoParallel {
        ECRistrettoParallel {}
    }
}

impl ECCipher for ECRistrettoParallel {
    type Item = RistrettoPoint;

    /// Each string maps to curve (Sha512 is used)
    fn hash(&self, plaintext: &[String]) -> Vec<Self::Item> {
        plaintext
            .into_par_iter()
            .map(|item| hash_to_point(item.as_bytes()))
            .collect::<Vec<Self::Item>>()
    }

    /// Encryption is a two-step operation
    ///
    /// - Step1: Each string maps to curve (Sha512 is used)
    ///
    /// - Step2: Curve point exponentiates to `key` power
    fn hash_encrypt(&self, plaintext: &[String], key: &Scalar) -> Result<Vec<Self::Item>> {
        check_scalar(key)?;
        Ok(plaintext
            .into_par_iter()
            .map(|item| hash_to_point(item.as_bytes()) * key)
            .collect::<Vec<Self::Item>>())
    }

    fn encrypt(&self, points: &[Self::Item], pow: &Scalar) -> Result<Vec<Self::Item>> {
        check_scalar(pow)?;
        Ok(points
            .into_par_iter()
            .map(|item| item * pow)
            .collect::<Vec<_>>())
    }

    fn to_elements(&self, points: &[Self::Item]) -> Vec<GroupElement> {
        points
            .into_par_iter()
            .map(GroupElement::from_point)
            .collect::<Vec<_>>()
    }

    fn to_points(&self, payload: &[GroupElement]) -> Result<Vec<Self::Item>> {
        payload
            .into_par_iter()
            .map(|item| item.to_point())
            .collect::<Result<Vec<_>>>()
    }

    fn to_points_encrypt(
        &self,
        payload: &[GroupElement],
        pow: &Scalar,
    ) -> Result<Vec<Self::Item>> {
        check_scalar(pow)?;
        payload
            .into_par_iter()
            .map(|item| item.to_point().map(|p| p * pow))
            .collect::<Result<Vec<_>>>()
    }

    fn hash_encrypt_to_elements(
        &self,
        plaintext: &[String],
        key: &Scalar,
    ) -> Result<Vec<GroupElement>> {
        check_scalar(key)?;
        // TODO: try `par_chunks` here, batching the compression step should
        // amortise the field inversions
        Ok(plaintext
            .into_par_iter()
            .map(|item| GroupElement::from_point(&(hash_to_point(item.as_bytes()) * key)))
            .collect::<Vec<GroupElement>>())
    }

    fn encrypt_elements(
        &self,
        payload: &[GroupElement],
        pow: &Scalar,
    ) -> Result<Vec<GroupElement>> {
        check_scalar(pow)?;
        payload
            .into_par_iter()
            .map(|item| point_multiply(item, pow))
            .collect::<Result<Vec<_>>>()
    }
}

impl Debug for ECRistrettoSequential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(f, "Ristretto EC ops sequential implementation")
    }
}

impl Debug for ECRistrettoParallel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(f, "Ristretto EC ops parallel implementation")
    }
}

fn hash_to_point(identifier: &[u8]) -> RistrettoPoint {
    RistrettoPoint::hash_from_bytes::<Sha512>(identifier)
}

/// Deterministic map from an identifier to a group element
pub fn hash_to_group(identifier: &[u8]) -> GroupElement {
    GroupElement::from_point(&hash_to_point(identifier))
}

/// Blinds a single element with `scalar`
pub fn point_multiply(element: &GroupElement, scalar: &Scalar) -> Result<GroupElement> {
    check_scalar(scalar)?;
    let p = element.to_point()?;
    Ok(GroupElement::from_point(&(p * scalar)))
}

/// Zero would collapse every identifier onto the identity point
pub fn check_scalar(scalar: &Scalar) -> Result<()> {
    if *scalar == Scalar::ZERO {
        Err(CryptoError::InvalidScalar)
    } else {
        Ok(())
    }
}

/// Decodes a secret from its canonical little-endian form
pub fn scalar_from_bytes(bytes: [u8; 32]) -> Result<Scalar> {
    let scalar: Option<Scalar> = Scalar::from_canonical_bytes(bytes).into();
    let scalar = scalar.ok_or(CryptoError::InvalidScalar)?;
    check_scalar(&scalar)?;
    Ok(scalar)
}

/// Generates random Scalar in `[1, l)`
///
/// the method would be used to get the blinding keys of both participants
///
/// the method uses
/// [CSPRNG](https://rust-num.github.io/num/rand/index.html#cryptographic-security)
/// random generator.
pub fn gen_scalar() -> Scalar {
    let mut rng = OsRng;
    loop {
        let mut scalar_bytes = [0u8; 64];
        rng.fill_bytes(&mut scalar_bytes);
        let s = Scalar::from_bytes_mod_order_wide(&scalar_bytes);
        if s != Scalar::ZERO {
            return s;
        }
    }
}
