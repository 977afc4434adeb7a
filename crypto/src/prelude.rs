//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

pub use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar,
    scalar::Scalar,
};
pub use num_bigint::BigInt;
pub use num_bigint::BigUint;

pub use crate::error::CryptoError;
pub use crate::paillier::Ciphertext;
pub use crate::paillier::DecryptionKey;
pub use crate::paillier::EncryptionKey;
pub use crate::paillier::PaillierCipher;
pub use crate::spoint::GroupElement;

pub type TPayload = Vec<GroupElement>;

pub const PAILLIER_PUBLIC_KEY_SIZE: u64 = 2048;

/// Smallest modulus size `PaillierCipher` accepts
pub const PAILLIER_MIN_KEY_SIZE: u64 = 512;
