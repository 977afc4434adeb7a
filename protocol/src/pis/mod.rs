//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

//! Private intersection-sum
//!
//! Participant 1 holds a set of identifiers, participant 2 holds
//! identifier-value pairs. After four rounds participant 1 knows
//! `|ids ∩ keys|` and participant 2 knows the sum of the values on the
//! intersection. Neither learns which identifiers matched.
//!
//! | round | direction | payload |
//! |-------|-----------|---------|
//! | 0 | P2 -> P1 | Paillier public key |
//! | 1 | P1 -> P2 | `H(v)^k1`, shuffled |
//! | 2 | P2 -> P1 | A = `H(v)^(k1 k2)` shuffled, B = `(H(w)^k2, Enc(t))` shuffled |
//! | 3 | P1 -> P2 | refreshed `Enc(sum)` |
//! | 4 | P2 | decryption |

pub mod participant1;
pub mod participant2;
pub mod traits;

use common::timer;
use crypto::prelude::BigInt;
use crypto::prelude::PaillierCipher;
use crypto::prelude::PAILLIER_PUBLIC_KEY_SIZE;

use crate::error::ProtocolError;
use crate::pis::participant1::Participant1;
use crate::pis::participant2::Participant2;
use crate::pis::traits::Participant1Protocol;
use crate::pis::traits::Participant2Protocol;
use crate::shared::TValue;

/// Both outputs of an in-process session
///
/// Only for callers that host both participants, such as tests and demos.
/// Across processes each side reads its own output from its participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PisOutcome {
    pub intersection_size: usize,
    pub intersection_sum: BigInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PisConfig {
    /// Paillier modulus size in bits
    pub key_size: u64,
}

impl Default for PisConfig {
    fn default() -> Self {
        PisConfig {
            key_size: PAILLIER_PUBLIC_KEY_SIZE,
        }
    }
}

/// Drives two participants through rounds 0 to 4
///
/// Each round consumes the previous round's output, a failure stops the
/// session and leaves the failing participant aborted.
pub fn run_with<P1, P2>(p1: &P1, p2: &P2) -> Result<PisOutcome, ProtocolError>
where
    P1: Participant1Protocol,
    P2: Participant2Protocol,
{
    let t = timer::Timer::new_silent("pis");

    // round 0
    let he_public_key = p2.setup()?;
    p1.setup()?;
    p1.receive_public_key(he_public_key)?;
    t.elapsed_log(Some("round 0: setup and key exchange"));

    // round 1
    let blinded = p1.produce_blinded_identifiers()?;
    t.elapsed_log(Some("round 1: blinded identifiers"));

    // round 2
    let (double_blinded, encrypted_pairs) = p2.prepare_messages(blinded)?;
    t.elapsed_log(Some("round 2: messages A and B"));

    // round 3
    let encrypted_sum = p1.compute_intersection_and_sum(double_blinded, encrypted_pairs)?;
    t.elapsed_log(Some("round 3: encrypted sum"));

    // round 4
    let intersection_sum = p2.decrypt_final_sum(encrypted_sum)?;
    t.elapsed_log(Some("round 4: decryption"));

    let intersection_size = p1.intersection_size()?;
    p1.finish()?;
    p2.finish()?;

    Ok(PisOutcome {
        intersection_size,
        intersection_sum,
    })
}

/// Runs a fresh session with the given Paillier key size
pub fn run_with_config(
    p1_ids: Vec<String>,
    p2_pairs: Vec<(String, TValue)>,
    config: &PisConfig,
) -> Result<PisOutcome, ProtocolError> {
    let p1 = Participant1::new();
    p1.set_identifiers(p1_ids)?;

    let p2 = Participant2::with_he_cipher(PaillierCipher::with_key_size(config.key_size)?);
    p2.set_identifier_values(p2_pairs)?;

    run_with(&p1, &p2)
}

/// Runs a fresh session with default settings
///
/// ## Example
///
/// ```no_run
/// use crypto::prelude::BigInt;
/// use protocol::pis;
///
/// let ids = vec![String::from("x"), String::from("y")];
/// let pairs = vec![(String::from("x"), 100), (String::from("z"), 7)];
///
/// let outcome = pis::run(ids, pairs).unwrap();
/// assert_eq!(outcome.intersection_size, 1);
/// assert_eq!(outcome.intersection_sum, BigInt::from(100));
/// ```
pub fn run(
    p1_ids: Vec<String>,
    p2_pairs: Vec<(String, TValue)>,
) -> Result<PisOutcome, ProtocolError> {
    run_with_config(p1_ids, p2_pairs, &PisConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pis::traits::MockParticipant1Protocol;
    use crate::pis::traits::MockParticipant2Protocol;
    use crypto::prelude::BigUint;
    use crypto::prelude::Ciphertext;
    use crypto::prelude::CryptoError;
    use crypto::prelude::EncryptionKey;
    use mockall::Sequence;

    fn dummy_key() -> EncryptionKey {
        EncryptionKey::from_modulus(BigUint::from(35u32))
    }

    #[test]
    fn test_rounds_run_in_order() {
        let mut seq = Sequence::new();
        let mut p1 = MockParticipant1Protocol::new();
        let mut p2 = MockParticipant2Protocol::new();

        p2.expect_setup()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(dummy_key()));
        p1.expect_setup()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        p1.expect_receive_public_key()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        p1.expect_produce_blinded_identifiers()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![]));
        p2.expect_prepare_messages()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok((vec![], vec![])));
        p1.expect_compute_intersection_and_sum()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Ciphertext::from_parts(BigUint::from(1u32), BigUint::from(35u32))));
        p2.expect_decrypt_final_sum()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(BigInt::from(12)));
        p1.expect_intersection_size()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(3));
        p1.expect_finish()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        p2.expect_finish()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        let outcome = run_with(&p1, &p2).unwrap();
        assert_eq!(
            outcome,
            PisOutcome {
                intersection_size: 3,
                intersection_sum: BigInt::from(12),
            }
        );
    }

    #[test]
    fn test_failed_round_stops_the_session() {
        let mut p1 = MockParticipant1Protocol::new();
        let mut p2 = MockParticipant2Protocol::new();

        p2.expect_setup().returning(|| Ok(dummy_key()));
        p1.expect_setup().returning(|| Ok(()));
        p1.expect_receive_public_key().returning(|_| Ok(()));
        p1.expect_produce_blinded_identifiers()
            .returning(|| Ok(vec![]));
        p2.expect_prepare_messages()
            .returning(|_| Err(CryptoError::InvalidScalar.into()));
        p1.expect_compute_intersection_and_sum().times(0);
        p2.expect_decrypt_final_sum().times(0);
        p1.expect_finish().times(0);
        p2.expect_finish().times(0);

        let e = run_with(&p1, &p2).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidScalar);
    }

    #[test]
    fn test_default_config() {
        assert_eq!(PisConfig::default().key_size, 2048);
    }
}
