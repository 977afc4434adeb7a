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
use crypto::prelude::BigUint;
use crypto::prelude::Ciphertext;
use crypto::prelude::CryptoError;
use crypto::prelude::EncryptionKey;
use crypto::prelude::GroupElement;
use crypto::prelude::PaillierCipher;
use crypto::prelude::Scalar;
use crypto::prelude::TPayload;
use num_traits::Zero;
use zeroize::Zeroizing;

use crate::error::ProtocolError;
use crate::fileio::load_identifiers;
use crate::pis::traits::Participant1Protocol;
use crate::shared::LoadData;
use crate::shared::TEncryptedPairs;

const PARTICIPANT: &str = "participant1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant1State {
    New,
    Setup,
    KeyReceived,
    BlindedSent,
    IntersectionComputed,
    Done,
    Aborted,
}

impl Participant1State {
    pub fn name(&self) -> &'static str {
        match self {
            Participant1State::New => "new",
            Participant1State::Setup => "setup",
            Participant1State::KeyReceived => "key_received",
            Participant1State::BlindedSent => "blinded_sent",
            Participant1State::IntersectionComputed => "intersection_computed",
            Participant1State::Done => "done",
            Participant1State::Aborted => "aborted",
        }
    }
}

/// Owns the identifier set, learns only the intersection size
///
/// The blinding scalar `k1` is drawn in `setup`, so every instance is one
/// session. A failed or out-of-order step leaves the participant `Aborted`.
pub struct Participant1<E = ECRistrettoParallel> {
    ec_cipher: E,
    he_cipher: PaillierCipher,
    state: RwLock<Participant1State>,
    ec_key: Arc<RwLock<Option<Zeroizing<Scalar>>>>,
    plaintext_keys: Arc<RwLock<Vec<String>>>,
    partner_he_public_key: Arc<RwLock<Option<EncryptionKey>>>,
    intersection_size: Arc<RwLock<Option<usize>>>,
}

impl Participant1 {
    pub fn new() -> Participant1 {
        Participant1::with_ec_cipher(ECRistrettoParallel::new())
    }
}

impl Default for Participant1 {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Participant1<E>
where
    E: ECCipher,
{
    pub fn with_ec_cipher(ec_cipher: E) -> Participant1<E> {
        Participant1 {
            ec_cipher,
            he_cipher: PaillierCipher::new(),
            state: RwLock::new(Participant1State::New),
            ec_key: Arc::new(RwLock::default()),
            plaintext_keys: Arc::new(RwLock::default()),
            partner_he_public_key: Arc::new(RwLock::default()),
            intersection_size: Arc::new(RwLock::default()),
        }
    }

    pub fn state(&self) -> Result<Participant1State, ProtocolError> {
        Ok(*self
            .state
            .read()
            .map_err(ProtocolError::poisoned(PARTICIPANT))?)
    }

    /// Sets the identifier set, duplicates are dropped
    ///
    /// Only allowed before `setup`.
    pub fn set_identifiers(&self, mut ids: Vec<String>) -> Result<(), ProtocolError> {
        self.transition(Participant1State::New, Participant1State::New, || {
            let total = ids.len();
            vectors::dedup_unstable(&mut ids, true);
            if ids.len() < total {
                debug!(
                    "{}: dropped {} duplicate identifiers",
                    PARTICIPANT,
                    total - ids.len()
                );
            }

            let mut keys = self
                .plaintext_keys
                .write()
                .map_err(ProtocolError::poisoned(PARTICIPANT))?;
            keys.clear();
            keys.extend(ids.drain(..));
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

    /// Runs `f` if the session is in `expected` and moves it to `next`
    ///
    /// The state lock is held for the whole step. Any error, including a
    /// wrong starting state, aborts the session.
    fn transition<T, F>(
        &self,
        expected: Participant1State,
        next: Participant1State,
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
            *state = Participant1State::Aborted;
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
                *state = Participant1State::Aborted;
                Err(e)
            }
        }
    }

    fn partner_key(&self) -> Result<EncryptionKey, ProtocolError> {
        self.partner_he_public_key
            .read()
            .map_err(ProtocolError::poisoned(PARTICIPANT))?
            .clone()
            .ok_or(ProtocolError::ProtocolStateError {
                participant: PARTICIPANT,
                expected: Participant1State::KeyReceived.name(),
                found: Participant1State::Setup.name(),
            })
    }
}

impl<E> LoadData for Participant1<E>
where
    E: ECCipher,
{
    fn load_data<T>(&self, input_path: T) -> Result<(), ProtocolError>
    where
        T: AsRef<Path>,
    {
        self.set_identifiers(load_identifiers(input_path)?)
    }
}

impl<E> Participant1Protocol for Participant1<E>
where
    E: ECCipher,
{
    fn setup(&self) -> Result<(), ProtocolError> {
        self.transition(Participant1State::New, Participant1State::Setup, || {
            let mut key = self
                .ec_key
                .write()
                .map_err(ProtocolError::poisoned(PARTICIPANT))?;
            *key = Some(Zeroizing::new(gen_scalar()));
            info!(
                "{}: setup done, {} identifiers",
                PARTICIPANT,
                self.get_self_num_records()?
            );
            Ok(())
        })
    }

    fn receive_public_key(&self, he_public_key: EncryptionKey) -> Result<(), ProtocolError> {
        self.transition(
            Participant1State::Setup,
            Participant1State::KeyReceived,
            || {
                he_public_key.check()?;
                debug!(
                    "{}: received {} bits HE public key",
                    PARTICIPANT,
                    he_public_key.n.bits()
                );
                *self
                    .partner_he_public_key
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))? = Some(he_public_key);
                Ok(())
            },
        )
    }

    fn produce_blinded_identifiers(&self) -> Result<TPayload, ProtocolError> {
        self.transition(
            Participant1State::KeyReceived,
            Participant1State::BlindedSent,
            || {
                let (key, text) = (
                    self.ec_key
                        .read()
                        .map_err(ProtocolError::poisoned(PARTICIPANT))?,
                    self.plaintext_keys
                        .read()
                        .map_err(ProtocolError::poisoned(PARTICIPANT))?,
                );
                let k1 = key.as_ref().ok_or(CryptoError::InvalidScalar)?;

                let _t = timer::Builder::new()
                    .label(PARTICIPANT)
                    .extra_label("hash and blind identifiers")
                    .size(text.len())
                    .build();
                let mut blinded = self
                    .ec_cipher
                    .hash_encrypt_to_elements(text.as_slice(), k1)?;
                permutations::shuffle(&mut blinded);

                info!("{}: sending {} blinded identifiers", PARTICIPANT, blinded.len());
                Ok(blinded)
            },
        )
    }

    fn compute_intersection_and_sum(
        &self,
        double_blinded: TPayload,
        encrypted_pairs: TEncryptedPairs,
    ) -> Result<Ciphertext, ProtocolError> {
        self.transition(
            Participant1State::BlindedSent,
            Participant1State::IntersectionComputed,
            || {
                let pk = self.partner_key()?;
                let key = self
                    .ec_key
                    .read()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?;
                let k1 = key.as_ref().ok_or(CryptoError::InvalidScalar)?;

                let (elements, ciphers): (Vec<GroupElement>, Vec<Ciphertext>) =
                    encrypted_pairs.into_iter().unzip();
                if ciphers.iter().any(|c| c.modulus() != &pk.n) {
                    return Err(CryptoError::KeyMismatch.into());
                }

                let partner_keys = {
                    let _t = timer::Builder::new()
                        .label(PARTICIPANT)
                        .extra_label("re-blind partner identifiers")
                        .size(elements.len())
                        .build();
                    self.ec_cipher.encrypt_elements(elements.as_slice(), k1)?
                };

                // match on blinded values only, Z is used as a set
                let mask = vectors::vec_intersection_mask(
                    partner_keys.as_slice(),
                    double_blinded.as_slice(),
                );
                let matched = vectors::apply_mask(&mask, ciphers);
                let size = matched.len();

                let _t = timer::Builder::new()
                    .label(PARTICIPANT)
                    .extra_label("HE sum and refresh")
                    .size(size)
                    .build();
                let sum = if matched.is_empty() {
                    self.he_cipher.encrypt(&pk, &BigUint::zero())?
                } else {
                    self.he_cipher.homomorphic_add(matched.as_slice())?
                };
                let res = self.he_cipher.refresh(&sum)?;

                *self
                    .intersection_size
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))? = Some(size);
                info!("{}: intersection size: {}", PARTICIPANT, size);
                Ok(res)
            },
        )
    }

    fn intersection_size(&self) -> Result<usize, ProtocolError> {
        let state = self.state()?;
        let size = *self
            .intersection_size
            .read()
            .map_err(ProtocolError::poisoned(PARTICIPANT))?;
        match (state, size) {
            (Participant1State::IntersectionComputed, Some(size))
            | (Participant1State::Done, Some(size)) => Ok(size),
            _ => Err(ProtocolError::ProtocolStateError {
                participant: PARTICIPANT,
                expected: Participant1State::IntersectionComputed.name(),
                found: state.name(),
            }),
        }
    }

    /// Wipes the scalar and the identifiers, keeps the intersection size
    fn finish(&self) -> Result<(), ProtocolError> {
        self.transition(
            Participant1State::IntersectionComputed,
            Participant1State::Done,
            || {
                self.ec_key
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?
                    .take();
                self.plaintext_keys
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?
                    .clear();
                self.partner_he_public_key
                    .write()
                    .map_err(ProtocolError::poisoned(PARTICIPANT))?
                    .take();
                Ok(())
            },
        )
    }
}

impl<E> Debug for Participant1<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let state = self
            .state
            .read()
            .map(|s| s.name())
            .unwrap_or("poisoned");
        write!(f, "Participant1 (state: {})", state)
    }
}
