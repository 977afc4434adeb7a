//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

/// Failures of the group and Paillier primitives
///
/// None of them is recoverable inside a session: the caller is expected to
/// abort the exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("Scalar is zero or not canonically reduced")]
    InvalidScalar,

    #[error("Bytes do not encode a group element: {0}")]
    InvalidGroupElement(String),

    #[error("Ciphertext was produced under a different key")]
    KeyMismatch,

    #[error("Malformed ciphertext: {0}")]
    DecryptionFailure(String),

    #[error("Plaintext is outside of the [0, n) domain")]
    PlaintextOutOfRange,

    #[error("Cannot add an empty list of ciphertexts")]
    EmptyCiphertextList,

    #[error("Unsupported Paillier key size {0}, expected an even size of at least 512 bits")]
    InvalidKeySize(u64),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
