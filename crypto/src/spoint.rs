//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::error::CryptoError;
use crate::prelude::CompressedRistretto;
use crate::prelude::RistrettoPoint;

pub const GROUP_ELEMENT_SIZE: usize = 32;

/// Canonical wire form of a Ristretto point
///
/// Ristretto compression is canonical, so two elements are the same
/// group member iff their bytes are equal. That is what lets blinded
/// values be compared and hashed directly.
#[derive(Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GroupElement {
    bytes: [u8; GROUP_ELEMENT_SIZE],
}

impl GroupElement {
    pub fn from_bytes(bytes: [u8; GROUP_ELEMENT_SIZE]) -> GroupElement {
        GroupElement { bytes }
    }

    pub fn from_slice(v: &[u8]) -> Result<GroupElement, CryptoError> {
        let bytes: [u8; GROUP_ELEMENT_SIZE] = v.try_into().map_err(|_| {
            CryptoError::InvalidGroupElement(format!(
                "expected {} bytes, got {}",
                GROUP_ELEMENT_SIZE,
                v.len()
            ))
        })?;
        Ok(GroupElement { bytes })
    }

    pub fn from_point(point: &RistrettoPoint) -> GroupElement {
        GroupElement {
            bytes: point.compress().to_bytes(),
        }
    }

    /// Decompresses the element, rejecting non-canonical encodings
    pub fn to_point(&self) -> Result<RistrettoPoint, CryptoError> {
        CompressedRistretto(self.bytes)
            .decompress()
            .ok_or_else(|| CryptoError::InvalidGroupElement(self.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8; GROUP_ELEMENT_SIZE] {
        &self.bytes
    }
}

impl Display for GroupElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", hex::encode(self.bytes))
    }
}
