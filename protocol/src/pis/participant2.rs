//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::fmt::Error;
use std::fmt::Formatter;
use std::path::Path;
use std::sync::Arc;
use std::sync::RwLock;

use common::permutations;
use common::timer;
use common::vectors;
use crypto::eccipher::gen_scalar;
use crypto::eccipher::ECCipher;
use crypto::eccipher::ECRistrettoParallel;
use crypto::prelude::BigInt;
use crypto::prelude::Ciphertext;
use crypto::prelude::CryptoError;
use crypto::prelude::DecryptionKey;
use crypto::prelude::EncryptionKey;
use crypto::prelude::PaillierCipher;
use crypto::prelude::Scalar;
use crypto::prelude::TPayload;
use zeroize::Zeroizing;

use crate::error::ProtocolError;
use crate::fileio::load_identifier_values;
use crate::pis::traits::Participant2Protocol;
use crate::shared::LoadData;
use crate::shared::ShareableEncKey;
use crate::shared::TEncryptedPairs;
use crate::shared::TValue;

const PARTICIPANT: &str = "participant2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant2State {
    New,
    Setup,
    MessagesSent,
    SumDecrypted,
    Done,
    Aborted,
}

impl Participant2State {
    pub fn name(&self) -> &'static str {
        match self {
            Participant2State::New => "new",
            Participant2State::Setup => "setup",
            Participant2State::MessagesSent => "messages_sent",
            Participant2State::SumDecrypted => "sum_decrypted",
            Participant2State::Done => "done",
            Participant2State::Aborted => "aborted",
        }
    }
}

/// Owns identifier-value pairs, learns only the intersection sum
///
/// `setup` draws the blinding scalar `k2` and a fresh Paillier key pair.
/// The private key never leaves this struct.
pub struct Participant2<E = ECRistrettoParallel> {
    ec_cipher: E,
    he_cipher: PaillierCipher,
    state: RwLock<Participant2State>,
    ec_key: Arc<RwLock<Option<Zeroizing<Scalar>>>>,
    he_public_key: Arc<RwLock<Option<EncryptionKey>>>,
    he_private_key: Arc<RwLock<Option<DecryptionKey>>>,
    plaintext_keys: Arc<RwLock<Vec<String>>>,
    plaintext_values: Arc<RwLock<Vec<TValue>>>,
    intersection_sum: Arc<RwLock<Option<BigInt>>>,
}

impl Participant2 {
    pub fn new() -> Participant2 {
        Participant2::with_he_cipher(PaillierCipher::new())
    }

    pub fn with_he_cipher(he_cipher: PaillierCipher) -> Participant2 {
        Participant2::with_ciphers(ECRistrettoParallel::new(), he_cipher)
    }
}

impl Default for Participant2 {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Participant2<E>
where
    E: ECCipher,
{
    pub fn with_ciphers(ec_cipher: E, he_cipher: PaillierCipher) -> Participant2<E> {
        Participant2 {
            ec_cipher,
            he_cipher,
            state: RwLock::new(Participant2State::New),
            ec_key: Arc::new(RwLock::default()),
            he_public_key: Arc::new(RwLock::default()),
            he_private_key: Arc::new(RwLock::default()),
            plaintext_keys: Arc::new(RwLock::default()),
            plaintext_values: Arc::new(RwLock::default()),
            intersection_sum: Arc::new(RwLock::default()),
        }
    }

    pub fn state(&self) -> Result<Participant2State, ProtocolError> {
        Ok(*self
            .state
            .read()
            .map_err(ProtocolError::poisoned(PARTICIPANT))?)
    }

    /// Sets the identifier-value pairs, only before `setup`
    ///
    /// A repeated identifier keeps its last value.
    pub fn set_identifier_values(&self, pairs: Vec<(String, TValue)>) -> Result<(), ProtocolError> {
        self.transition(Participant2State::New, Participant2State::New, || {
            let (pairs, dropped) = vectors::dedup_by_key_last(pairs);
            if dropped > 0 {
                warn!(
                    "{}: {} duplicate identifiers, keeping the last value of each",
                    PARTICIPANT, dropped
                );
            }

            let (mut keys, mut values) = (
                self.plaintext_keys
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?,
                self.plaintext_values
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?,
            );
            let (k, v): (Vec<String>, Vec<TValue>) = pairs.into_iter().unzip();
            keys.clear();
            keys.extend(k);
            values.clear();
            values.extend(v);
            Ok(())
        })
    }

    pub fn get_self_num_records(&self) -> Result<usize, ProtocolError> {
        Ok(self
            .plaintext_keys
            .read()
            .map_err(ProtocolError::poisoned(PARTICIPANT))?
            .len())
    }

    /// Runs `f` if the session is in `expected` and moves it to `next`,
    /// any error aborts the session
    fn transition<T, F>(
        &self,
        expected: Participant2State,
        next: Participant2State,
        f: F,
    ) -> Result<T, ProtocolError>
    where
        F: FnOnce() -> Result<T, ProtocolError>,
    {
        let mut state = self
            .state
            .write()
            .map_err(ProtocolError::poisoned(PARTICIPANT))?;
        if *state != expected {
            let found = state.name();
            *state = Participant2State::Aborted;
            return Err(ProtocolError::ProtocolStateError {
                participant: PARTICIPANT,
                expected: expected.name(),
                found,
            });
        }

        match f() {
            Ok(res) => {
                *state = next;
                Ok(res)
            }
            Err(e) => {
                error!("{}: session aborted: {}", PARTICIPANT, e);
                *state = Participant2State::Aborted;
                Err(e)
            }
        }
    }
}

impl<E> LoadData for Participant2<E>
where
    E: ECCipher,
{
    fn load_data<T>(&self, input_path: T) -> Result<(), ProtocolError>
    where
        T: AsRef<Path>,
    {
        self.set_identifier_values(load_identifier_values(input_path)?)
    }
}

impl<E> ShareableEncKey for Participant2<E>
where
    E: ECCipher,
{
    fn get_he_public_key(&self) -> Result<EncryptionKey, ProtocolError> {
        let state = self.state()?;
        self.he_public_key
            .read()
            .map_err(ProtocolError::poisoned(PARTICIPANT))?
            .clone()
            .ok_or(ProtocolError::ProtocolStateError {
                participant: PARTICIPANT,
                expected: Participant2State::Setup.name(),
                found: state.name(),
            })
    }
}

impl<E> Participant2Protocol for Participant2<E>
where
    E: ECCipher,
{
    fn setup(&self) -> Result<EncryptionKey, ProtocolError> {
        self.transition(Participant2State::New, Participant2State::Setup, || {
            let _t = timer::Builder::new()
                .label(PARTICIPANT)
                .extra_label("HE keygen")
                .build();
            let (pk, sk) = self.he_cipher.keygen();

            *self
                .ec_key
                .write()
                .map_err(ProtocolError::poisoned(PARTICIPANT))? = Some(Zeroizing::new(gen_scalar()));
            *self
                .he_private_key
                .write()
                .map_err(ProtocolError::poisoned(PARTICIPANT))? = Some(sk);
            *self
                .he_public_key
                .write()
                .map_err(ProtocolError::poisoned(PARTICIPANT))? = Some(pk.clone());

            info!(
                "{}: setup done, {} identifiers, {} bits HE key",
                PARTICIPANT,
                self.get_self_num_records()?,
                self.he_cipher.key_size()
            );
            Ok(pk)
        })
    }

    fn prepare_messages(
        &self,
        blinded: TPayload,
    ) -> Result<(TPayload, TEncryptedPairs), ProtocolError> {
        self.transition(
            Participant2State::Setup,
            Participant2State::MessagesSent,
            || {
                let (key, pk, text, values) = (
                    self.ec_key
                        .read()
                        .map_err(ProtocolError::poisoned(PARTICIPANT))?,
                    self.he_public_key
                        .read()
                        .map_err(ProtocolError::poisoned(PARTICIPANT))?,
                    self.plaintext_keys
                        .read()
                        .map_err(ProtocolError::poisoned(PARTICIPANT))?,
                    self.plaintext_values
                        .read()
                        .map_err(ProtocolError::poisoned(PARTICIPANT))?,
                );
                let k2 = key.as_ref().ok_or(CryptoError::InvalidScalar)?;
                let pk = pk.as_ref().ok_or(CryptoError::KeyMismatch)?;

                // message A: participant 1 identifiers, blinded twice
                let mut double_blinded = {
                    let _t = timer::Builder::new()
                        .label(PARTICIPANT)
                        .extra_label("re-blind partner identifiers")
                        .size(blinded.len())
                        .build();
                    self.ec_cipher.encrypt_elements(blinded.as_slice(), k2)?
                };
                permutations::shuffle(&mut double_blinded);

                // message B: own identifiers blinded once, with encrypted values
                let mut encrypted_pairs = {
                    let _t = timer::Builder::new()
                        .label(PARTICIPANT)
                        .extra_label("blind identifiers and encrypt values")
                        .size(text.len())
                        .build();
                    let elements = self
                        .ec_cipher
                        .hash_encrypt_to_elements(text.as_slice(), k2)?;
                    let ciphers = self
                        .he_cipher
                        .enc_serialise_signed(pk, values.as_slice())?;
                    elements
                        .into_iter()
                        .zip(ciphers.into_iter())
                        .collect::<TEncryptedPairs>()
                };
                permutations::shuffle(&mut encrypted_pairs);

                info!(
                    "{}: sending {} double blinded identifiers and {} encrypted pairs",
                    PARTICIPANT,
                    double_blinded.len(),
                    encrypted_pairs.len()
                );
                Ok((double_blinded, encrypted_pairs))
            },
        )
    }

    fn decrypt_final_sum(&self, encrypted_sum: Ciphertext) -> Result<BigInt, ProtocolError> {
        self.transition(
            Participant2State::MessagesSent,
            Participant2State::SumDecrypted,
            || {
                let sk = self
                    .he_private_key
                    .read()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?;
                let sk = sk.as_ref().ok_or(CryptoError::KeyMismatch)?;
                let sum = self.he_cipher.decrypt_signed(sk, &encrypted_sum)?;

                *self
                    .intersection_sum
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))? = Some(sum.clone());
                info!("{}: intersection sum: {}", PARTICIPANT, sum);
                Ok(sum)
            },
        )
    }

    fn intersection_sum(&self) -> Result<BigInt, ProtocolError> {
        let state = self.state()?;
        let sum = self
            .intersection_sum
            .read()
            .map_err(ProtocolError::poisoned(PARTICIPANT))?
            .clone();
        match (state, sum) {
            (Participant2State::SumDecrypted, Some(sum))
            | (Participant2State::Done, Some(sum)) => Ok(sum),
            _ => Err(ProtocolError::ProtocolStateError {
                participant: PARTICIPANT,
                expected: Participant2State::SumDecrypted.name(),
                found: state.name(),
            }),
        }
    }

    /// Drops the key pair, the scalar and the input, keeps the sum
    fn finish(&self) -> Result<(), ProtocolError> {
        self.transition(
            Participant2State::SumDecrypted,
            Participant2State::Done,
            || {
                self.ec_key
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?
                    .take();
                self.he_private_key
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?
                    .take();
                self.he_public_key
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?
                    .take();
                self.plaintext_keys
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?
                    .clear();
                self.plaintext_values
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?
                    .clear();
                Ok(())
            },
        )
    }
}

impl<E> Debug for Participant2<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let state = self
            .state
            .read()
            .map(|s| s.name())
            .unwrap_or("poisoned");
        write!(f, "Participant2 (state: {})", state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crypto::eccipher::hash_to_group;
    use crypto::eccipher::point_multiply;
    use crypto::eccipher::ECRistrettoSequential;
    use crypto::prelude::GroupElement;

    fn participant(pairs: &[(&str, TValue)]) -> Participant2 {
        let p2 = Participant2::with_he_cipher(PaillierCipher::with_key_size(1024).unwrap());
        p2.set_identifier_values(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
            .unwrap();
        p2
    }

    #[test]
    fn test_last_value_wins() {
        let p2 = participant(&[("a", 1), ("b", 2), ("a", 3)]);
        assert_eq!(p2.get_self_num_records().unwrap(), 2);
        assert_eq!(*p2.plaintext_values.read().unwrap(), vec![3, 2]);
    }

    #[test]
    fn test_setup_shares_public_key() {
        let p2 = participant(&[("a", 1)]);
        assert!(p2.get_he_public_key().is_err());

        let pk = p2.setup().unwrap();
        assert_eq!(pk.n.bits(), 1024);
        assert_eq!(p2.get_he_public_key().unwrap().n, pk.n);
    }

    #[test]
    fn test_messages_shape() {
        let p2 = participant(&[("a", 10), ("b", -20), ("c", 30)]);
        let pk = p2.setup().unwrap();

        let blinded = vec![hash_to_group(b"x"), hash_to_group(b"y")];
        let (a, b) = p2.prepare_messages(blinded).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 3);
        assert!(b.iter().all(|(_, c)| c.modulus() == &pk.n));
        assert_eq!(p2.state().unwrap(), Participant2State::MessagesSent);
    }

    #[test]
    fn test_message_a_is_reblinded_input() {
        let p2 = participant(&[("a", 1)]);
        p2.setup().unwrap();
        let h = hash_to_group(b"x");
        let (a, _) = p2.prepare_messages(vec![h]).unwrap();

        let k2 = p2.ec_key.read().unwrap().as_ref().map(|k| **k).unwrap();
        assert_eq!(a, vec![point_multiply(&h, &k2).unwrap()]);
    }

    #[test]
    fn test_messages_are_shuffled_independently() {
        let owned = (0..64)
            .map(|i| (format!("w_{:02}", i), i as TValue))
            .collect::<Vec<(String, TValue)>>();
        let p2 = Participant2::with_he_cipher(PaillierCipher::with_key_size(1024).unwrap());
        p2.set_identifier_values(owned).unwrap();
        p2.setup().unwrap();

        let blinded = (0..64)
            .map(|i| hash_to_group(format!("v_{}", i).as_bytes()))
            .collect::<Vec<GroupElement>>();
        let (a, b) = p2.prepare_messages(blinded.clone()).unwrap();

        let k2 = p2.ec_key.read().unwrap().as_ref().map(|k| **k).unwrap();
        let mut a_in_order = p2.ec_cipher.encrypt_elements(&blinded, &k2).unwrap();
        let mut b_in_order = {
            let keys = p2.plaintext_keys.read().unwrap();
            p2.ec_cipher
                .hash_encrypt_to_elements(keys.as_slice(), &k2)
                .unwrap()
        };

        let mut a_sent = a.clone();
        let mut b_sent = b.iter().map(|(e, _)| *e).collect::<Vec<GroupElement>>();
        assert_ne!(a_sent, a_in_order);
        assert_ne!(b_sent, b_in_order);

        // same content, different order
        a_sent.sort();
        a_in_order.sort();
        assert_eq!(a_sent, a_in_order);
        b_sent.sort();
        b_in_order.sort();
        assert_eq!(b_sent, b_in_order);
    }

    #[test]
    fn test_decrypt_final_sum() {
        let p2 = participant(&[("a", 1)]);
        let pk = p2.setup().unwrap();
        p2.prepare_messages(vec![]).unwrap();

        let he = PaillierCipher::with_key_size(1024).unwrap();
        let c = he.encrypt_signed(&pk, -42).unwrap();
        assert_eq!(p2.decrypt_final_sum(c).unwrap(), BigInt::from(-42));
        assert_eq!(p2.intersection_sum().unwrap(), BigInt::from(-42));

        p2.finish().unwrap();
        assert_eq!(p2.intersection_sum().unwrap(), BigInt::from(-42));
        assert!(p2.he_private_key.read().unwrap().is_none());
        assert!(p2.ec_key.read().unwrap().is_none());
        assert_eq!(p2.get_self_num_records().unwrap(), 0);
    }

    #[test]
    fn test_foreign_ciphertext_aborts() {
        let p2 = participant(&[("a", 1)]);
        p2.setup().unwrap();
        p2.prepare_messages(vec![]).unwrap();

        let other = PaillierCipher::with_key_size(1024).unwrap();
        let (other_pk, _) = other.keygen();
        let c = other.encrypt_signed(&other_pk, 7).unwrap();

        let e = p2.decrypt_final_sum(c).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::KeyMismatch);
        assert_eq!(p2.state().unwrap(), Participant2State::Aborted);
        assert!(p2.intersection_sum().is_err());
    }

    #[test]
    fn test_malformed_ciphertext_aborts() {
        let p2 = participant(&[("a", 1)]);
        let pk = p2.setup().unwrap();
        p2.prepare_messages(vec![]).unwrap();

        let c = Ciphertext::from_parts(crypto::prelude::BigUint::from(0u32), pk.n);
        let e = p2.decrypt_final_sum(c).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::DecryptionFailure);
    }

    #[test]
    fn test_decrypt_before_messages() {
        let p2 = Participant2::with_ciphers(
            ECRistrettoSequential::new(),
            PaillierCipher::with_key_size(1024).unwrap(),
        );
        let pk = p2.setup().unwrap();
        let c = PaillierCipher::new().encrypt_signed(&pk, 1).unwrap();

        let e = p2.decrypt_final_sum(c).unwrap_err();
        assert!(matches!(
            e,
            ProtocolError::ProtocolStateError {
                expected: "messages_sent",
                found: "setup",
                ..
            }
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let p2 = participant(&[("a", 1)]);
        p2.setup().unwrap();
        assert_eq!(format!("{:?}", p2), "Participant2 (state: setup)");
    }
}
