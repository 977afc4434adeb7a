//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::sync::PoisonError;

use common::files::FileError;
use crypto::prelude::CryptoError;

/// Coarse classification of a failed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidScalar,
    KeyMismatch,
    EmptyInputSet,
    DecryptionFailure,
    ProtocolStateError,
    Other,
}

/// Any of these aborts the session: there is no partial result
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Input set is empty")]
    EmptyInputSet,

    #[error("{participant}: step requires state {expected}, current state is {found}")]
    ProtocolStateError {
        participant: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}: state lock is poisoned")]
    LockPoisoned(&'static str),

    #[error("Failed to load input: {0}")]
    File(#[from] FileError),
}

impl ProtocolError {
    pub(crate) fn poisoned<T>(participant: &'static str) -> impl Fn(PoisonError<T>) -> ProtocolError {
        move |_| ProtocolError::LockPoisoned(participant)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Crypto(CryptoError::InvalidScalar) => ErrorKind::InvalidScalar,
            ProtocolError::Crypto(CryptoError::KeyMismatch) => ErrorKind::KeyMismatch,
            ProtocolError::Crypto(CryptoError::DecryptionFailure(_)) => {
                ErrorKind::DecryptionFailure
            }
            ProtocolError::EmptyInputSet => ErrorKind::EmptyInputSet,
            ProtocolError::ProtocolStateError { .. } => ErrorKind::ProtocolStateError,
            _ => ErrorKind::Other,
        }
    }
}
