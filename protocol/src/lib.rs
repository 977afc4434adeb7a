//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![crate_name = "protocol"]

#[macro_use]
extern crate log;

pub mod error;
pub mod fileio;
pub mod pis;

pub mod shared {
    extern crate crypto;

    use std::path::Path;

    use crypto::prelude::Ciphertext;
    use crypto::prelude::EncryptionKey;
    use crypto::prelude::GroupElement;

    use crate::error::ProtocolError;

    /// Values participant 2 attaches to its identifiers
    pub type TValue = i64;

    /// Blinded identifiers paired with encrypted values
    pub type TEncryptedPairs = Vec<(GroupElement, Ciphertext)>;

    pub trait LoadData {
        fn load_data<T>(&self, input_path: T) -> Result<(), ProtocolError>
        where
            T: AsRef<Path>;
    }

    pub trait ShareableEncKey {
        fn get_he_public_key(&self) -> Result<EncryptionKey, ProtocolError>;
    }
}
