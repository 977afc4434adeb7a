//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
use mockall::automock;

use crypto::prelude::BigInt;
use crypto::prelude::Ciphertext;
use crypto::prelude::EncryptionKey;
use crypto::prelude::TPayload;

use crate::error::ProtocolError;
use crate::shared::TEncryptedPairs;

/// Side that owns the identifier set and learns the intersection size
#[cfg_attr(test, automock)]
pub trait Participant1Protocol {
    fn setup(&self) -> Result<(), ProtocolError>;
    fn receive_public_key(&self, he_public_key: EncryptionKey) -> Result<(), ProtocolError>;

    fn produce_blinded_identifiers(&self) -> Result<TPayload, ProtocolError>;
    fn compute_intersection_and_sum(
        &self,
        double_blinded: TPayload,
        encrypted_pairs: TEncryptedPairs,
    ) -> Result<Ciphertext, ProtocolError>;

    fn intersection_size(&self) -> Result<usize, ProtocolError>;
    fn finish(&self) -> Result<(), ProtocolError>;
}

/// Side that owns identifier-value pairs and learns the intersection sum
#[cfg_attr(test, automock)]
pub trait Participant2Protocol {
    fn setup(&self) -> Result<EncryptionKey, ProtocolError>;

    fn prepare_messages(
        &self,
        blinded: TPayload,
    ) -> Result<(TPayload, TEncryptedPairs), ProtocolError>;
    fn decrypt_final_sum(&self, encrypted_sum: Ciphertext) -> Result<BigInt, ProtocolError>;

    fn intersection_sum(&self) -> Result<BigInt, ProtocolError>;
    fn finish(&self) -> Result<(), ProtocolError>;
}
