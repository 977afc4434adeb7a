//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::fmt::Error;
use std::fmt::Formatter;

use num_bigint::BigInt;
use num_bigint::BigUint;
use num_bigint::RandBigInt;
use num_traits::identities::Zero;
use num_traits::One;
use rand::rngs::OsRng;
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use serde::Deserialize;
use serde::Serialize;

use crate::error::CryptoError;
use crate::error::Result;
use crate::gcd::is_coprime;
use crate::gcd::mod_inverse;
use crate::prelude::PAILLIER_MIN_KEY_SIZE;
use crate::prelude::PAILLIER_PUBLIC_KEY_SIZE;
use crate::prime::sample_prime;

/// Public half of a Paillier key pair, `g = n + 1` is implied
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKey {
    pub n: BigUint,
    pub nn: BigUint,
}

impl EncryptionKey {
    pub fn from_modulus(n: BigUint) -> EncryptionKey {
        let nn = &n * &n;
        EncryptionKey { n, nn }
    }

    /// Rejects moduli too small to sample a mask from
    pub fn check(&self) -> Result<()> {
        check_modulus(&self.n)
    }
}

fn check_modulus(n: &BigUint) -> Result<()> {
    if n.bits() < PAILLIER_MIN_KEY_SIZE {
        return Err(CryptoError::InvalidKeySize(n.bits()));
    }
    Ok(())
}

/// Private half of a Paillier key pair
///
/// Holds the CRT decomposition used by `decrypt_fast`. It is neither
/// `Clone` nor serializable, and `Debug` prints the modulus size only.
pub struct DecryptionKey {
    p: BigUint,
    q: BigUint,
    p_1: BigUint,
    q_1: BigUint,
    // p^-1 mod q
    p_inv: BigUint,
    pp: BigUint,
    qq: BigUint,
    h_p: BigUint,
    h_q: BigUint,
    n: BigUint,
}

impl DecryptionKey {
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }
}

impl Debug for DecryptionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(f, "Paillier decryption key ({} bits)", self.n.bits())
    }
}

/// Paillier ciphertext tagged with the modulus it was produced under
///
/// The modulus travels with the value so that a ciphertext from another
/// session is rejected instead of decrypting to garbage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    value: BigUint,
    modulus: BigUint,
}

impl Ciphertext {
    pub fn from_parts(value: BigUint, modulus: BigUint) -> Ciphertext {
        Ciphertext { value, modulus }
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Little endian encoding of the value
    pub fn to_bytes(&self) -> Vec<u8> {
        self.value.to_bytes_le()
    }
}

fn gen_primes(key_size: u64) -> (BigUint, BigUint) {
    loop {
        let p = sample_prime(key_size / 2);
        let q = sample_prime(key_size / 2);
        if p != q {
            return (p, q);
        }
    }
}

fn l(x: &BigUint, n: &BigUint) -> BigUint {
    (x - BigUint::one()) / n
}

fn gen_decryption_key(p: BigUint, q: BigUint) -> Option<DecryptionKey> {
    let n = &p * &q;
    let pp = &p * &p;
    let qq = &q * &q;
    let p_1 = &p - BigUint::one();
    let q_1 = &q - BigUint::one();
    let p_inv = mod_inverse(&p, &q)?;

    // g = n + 1
    let g = &n + BigUint::one();
    let h_p = mod_inverse(&l(&g.modpow(&p_1, &pp), &p), &p)?;
    let h_q = mod_inverse(&l(&g.modpow(&q_1, &qq), &q), &q)?;

    Some(DecryptionKey {
        p,
        q,
        p_1,
        q_1,
        p_inv,
        pp,
        qq,
        h_p,
        h_q,
        n,
    })
}

fn gen_keypair(key_size: u64) -> (EncryptionKey, DecryptionKey) {
    loop {
        let (p, q) = gen_primes(key_size);
        let n = &p * &q;
        if let Some(dec_key) = gen_decryption_key(p, q) {
            return (EncryptionKey::from_modulus(n), dec_key);
        }
    }
}

/// Random unit `r` of `Z_n`, raised to `n` mod `n^2`
fn random_mask(key: &EncryptionKey) -> BigUint {
    let mut rng = OsRng;
    loop {
        // Random sample from [1, n)
        let r = rng.gen_biguint_range(&BigUint::one(), &key.n);
        if is_coprime(&r, &key.n) {
            return r.modpow(&key.n, &key.nn);
        }
    }
}

fn encrypt(msg: &BigUint, key: &EncryptionKey) -> BigUint {
    // For us g = key.n + 1. Hence g^m is (n + 1)^m mod n^2 which is (1 + m * n)
    let g_m = BigUint::one() + msg * &key.n;
    (g_m * random_mask(key)) % &key.nn
}

// Algorithm from section 7 of
// http://citeseerx.ist.psu.edu/viewdoc/download?doi=10.1.1.112.4035&rep=rep1&type=pdf
fn decrypt_fast(msg: &BigUint, key: &DecryptionKey) -> BigUint {
    let m_p = (l(&msg.modpow(&key.p_1, &key.pp), &key.p) * &key.h_p) % &key.p;
    let m_q = (l(&msg.modpow(&key.q_1, &key.qq), &key.q) * &key.h_q) % &key.q;

    // Combine via Chinese Remainder Theorem
    let diff = (&m_q + &key.q - (&m_p % &key.q)) % &key.q;
    let t = (diff * &key.p_inv) % &key.q;
    m_p + t * &key.p
}

/// Maps a signed value onto `Z_n`, negatives wrap to the upper half
pub fn encode_signed(value: i64, n: &BigUint) -> BigUint {
    let magnitude = BigUint::from(value.unsigned_abs()) % n;
    if value < 0 && !magnitude.is_zero() {
        n - magnitude
    } else {
        magnitude
    }
}

/// Inverse of `encode_signed`: values above `n / 2` are read as negative
pub fn decode_signed(value: &BigUint, n: &BigUint) -> BigInt {
    if value > &(n >> 1u32) {
        BigInt::from(value.clone()) - BigInt::from(n.clone())
    } else {
        BigInt::from(value.clone())
    }
}

/// Additively homomorphic Paillier scheme
///
/// The cipher holds no key material. Key pairs are produced by `keygen`
/// and owned by the caller, so every session gets its own pair.
///
/// Plaintexts live in `[0, n)` and sums wrap mod `n`; the modulus must
/// be sized to exceed any expected sum.
pub struct PaillierCipher {
    key_size: u64,
}

impl PaillierCipher {
    pub fn new() -> PaillierCipher {
        PaillierCipher {
            key_size: PAILLIER_PUBLIC_KEY_SIZE,
        }
    }

    pub fn with_key_size(key_size: u64) -> Result<PaillierCipher> {
        if key_size < PAILLIER_MIN_KEY_SIZE || key_size % 2 != 0 {
            return Err(CryptoError::InvalidKeySize(key_size));
        }
        Ok(PaillierCipher { key_size })
    }

    pub fn key_size(&self) -> u64 {
        self.key_size
    }

    pub fn keygen(&self) -> (EncryptionKey, DecryptionKey) {
        gen_keypair(self.key_size)
    }

    pub fn encrypt(&self, key: &EncryptionKey, msg: &BigUint) -> Result<Ciphertext> {
        key.check()?;
        if msg >= &key.n {
            return Err(CryptoError::PlaintextOutOfRange);
        }
        Ok(Ciphertext {
            value: encrypt(msg, key),
            modulus: key.n.clone(),
        })
    }

    pub fn encrypt_signed(&self, key: &EncryptionKey, value: i64) -> Result<Ciphertext> {
        self.encrypt(key, &encode_signed(value, &key.n))
    }

    /// Encrypts a batch of signed values in parallel, keeping their order
    pub fn enc_serialise_signed(
        &self,
        key: &EncryptionKey,
        raw_text: &[i64],
    ) -> Result<Vec<Ciphertext>> {
        raw_text
            .into_par_iter()
            .map(|item| self.encrypt_signed(key, *item))
            .collect::<Result<Vec<Ciphertext>>>()
    }

    pub fn decrypt(&self, key: &DecryptionKey, cipher: &Ciphertext) -> Result<BigUint> {
        if cipher.modulus != key.n {
            return Err(CryptoError::KeyMismatch);
        }
        let nn = &key.n * &key.n;
        if cipher.value.is_zero() || cipher.value >= nn {
            return Err(CryptoError::DecryptionFailure(String::from(
                "value outside of (0, n^2)",
            )));
        }
        if !is_coprime(&cipher.value, &key.n) {
            return Err(CryptoError::DecryptionFailure(String::from(
                "value is not a unit mod n",
            )));
        }
        Ok(decrypt_fast(&cipher.value, key))
    }

    pub fn decrypt_signed(&self, key: &DecryptionKey, cipher: &Ciphertext) -> Result<BigInt> {
        let m = self.decrypt(key, cipher)?;
        Ok(decode_signed(&m, &key.n))
    }

    /// Encryption of the sum of the plaintexts
    ///
    /// An empty list is rejected: with no ciphertext there is no key to
    /// encrypt zero under, so callers encrypt zero themselves.
    pub fn homomorphic_add(&self, ciphers: &[Ciphertext]) -> Result<Ciphertext> {
        let first = ciphers.first().ok_or(CryptoError::EmptyCiphertextList)?;
        let n = &first.modulus;
        let nn = n * n;

        let mut acc = BigUint::one();
        for item in ciphers {
            if &item.modulus != n {
                return Err(CryptoError::KeyMismatch);
            }
            acc = (acc * &item.value) % &nn;
        }
        Ok(Ciphertext {
            value: acc,
            modulus: n.clone(),
        })
    }

    /// Re-randomizes a ciphertext without changing its plaintext
    ///
    /// Multiplies by a fresh encryption of zero, so the result cannot be
    /// linked to the ciphertexts it was summed from.
    pub fn refresh(&self, cipher: &Ciphertext) -> Result<Ciphertext> {
        check_modulus(&cipher.modulus)?;
        let key = EncryptionKey::from_modulus(cipher.modulus.clone());
        Ok(Ciphertext {
            value: (&cipher.value * random_mask(&key)) % &key.nn,
            modulus: key.n,
        })
    }
}

impl Debug for PaillierCipher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(f, "Paillier Cipher ({} bits)", self.key_size)
    }
}

impl Default for PaillierCipher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use num_bigint::RandBigInt;
    use rand::distributions::Uniform;
    use rand::Rng;

    use super::*;

    const TEST_KEY_SIZE: u64 = 1024;

    fn test_cipher() -> (PaillierCipher, EncryptionKey, DecryptionKey) {
        let cipher = PaillierCipher::with_key_size(TEST_KEY_SIZE).unwrap();
        let (e_key, d_key) = cipher.keygen();
        (cipher, e_key, d_key)
    }

    #[test]
    fn check_key_size() {
        let (_, e_key, d_key) = test_cipher();
        assert_eq!(e_key.n.bits(), TEST_KEY_SIZE);
        assert_eq!(e_key.nn, &e_key.n * &e_key.n);
        assert_eq!(d_key.modulus(), &e_key.n);
        assert_eq!(format!("{:?}", d_key), "Paillier decryption key (1024 bits)");
    }

    #[test]
    fn check_invalid_key_size() {
        assert_eq!(
            PaillierCipher::with_key_size(256).unwrap_err(),
            CryptoError::InvalidKeySize(256)
        );
        assert_eq!(
            PaillierCipher::with_key_size(1025).unwrap_err(),
            CryptoError::InvalidKeySize(1025)
        );
        assert_eq!(PaillierCipher::default().key_size(), 2048);
    }

    #[test]
    fn check_enc_dec() {
        let mut rng = rand::thread_rng();
        let (cipher, e_key, d_key) = test_cipher();

        for _ in 0..100 {
            let msg = rng.gen_biguint_range(&BigUint::zero(), &e_key.n);
            let c = cipher.encrypt(&e_key, &msg).unwrap();
            assert_eq!(cipher.decrypt(&d_key, &c).unwrap(), msg);
        }

        let edge = &e_key.n - BigUint::one();
        let c = cipher.encrypt(&e_key, &edge).unwrap();
        assert_eq!(cipher.decrypt(&d_key, &c).unwrap(), edge);
    }

    #[test]
    fn check_plaintext_out_of_range() {
        let (cipher, e_key, _) = test_cipher();
        assert_eq!(
            cipher.encrypt(&e_key, &e_key.n).unwrap_err(),
            CryptoError::PlaintextOutOfRange
        );
    }

    #[test]
    fn check_encryption_is_randomized() {
        let (cipher, e_key, _) = test_cipher();
        let msg = BigUint::from(42u32);
        let c1 = cipher.encrypt(&e_key, &msg).unwrap();
        let c2 = cipher.encrypt(&e_key, &msg).unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn check_signed_roundtrip() {
        let (cipher, e_key, d_key) = test_cipher();
        for v in [0i64, 1, -1, 42, -42, i64::MAX, i64::MIN] {
            let c = cipher.encrypt_signed(&e_key, v).unwrap();
            assert_eq!(cipher.decrypt_signed(&d_key, &c).unwrap(), BigInt::from(v));
        }
    }

    #[test]
    fn check_enc_enc_add() {
        let mut rng = rand::thread_rng();
        let (cipher, e_key, d_key) = test_cipher();

        for _ in 0..50 {
            let msg1 = rng.gen_biguint_range(&BigUint::zero(), &e_key.n);
            let msg2 = rng.gen_biguint_range(&BigUint::zero(), &e_key.n);
            let c1 = cipher.encrypt(&e_key, &msg1).unwrap();
            let c2 = cipher.encrypt(&e_key, &msg2).unwrap();
            let sum = cipher.homomorphic_add(&[c1, c2]).unwrap();
            assert_eq!(
                cipher.decrypt(&d_key, &sum).unwrap(),
                (msg1 + msg2) % &e_key.n
            );
        }
    }

    #[test]
    fn check_signed_sum_reduce() {
        let mut rng = rand::thread_rng();
        let (cipher, e_key, d_key) = test_cipher();

        let range = Uniform::new(-(1_i64 << 40), 1_i64 << 40);
        let vals: Vec<i64> = (0..200).map(|_| rng.sample(&range)).collect();
        let expected: i64 = vals.iter().sum();

        let x = cipher.enc_serialise_signed(&e_key, &vals).unwrap();
        assert_eq!(x.len(), vals.len());
        let sum = cipher.homomorphic_add(&x).unwrap();
        assert_eq!(
            cipher.decrypt_signed(&d_key, &sum).unwrap(),
            BigInt::from(expected)
        );
    }

    #[test]
    fn check_empty_sum_is_rejected() {
        let (cipher, _, _) = test_cipher();
        assert_eq!(
            cipher.homomorphic_add(&[]).unwrap_err(),
            CryptoError::EmptyCiphertextList
        );
    }

    #[test]
    fn check_refresh() {
        let (cipher, e_key, d_key) = test_cipher();
        for v in [0i64, 7, -7] {
            let c = cipher.encrypt_signed(&e_key, v).unwrap();
            let r = cipher.refresh(&c).unwrap();
            assert_ne!(c.to_bytes(), r.to_bytes());
            assert_eq!(r.modulus(), c.modulus());
            assert_eq!(
                cipher.decrypt_signed(&d_key, &r).unwrap(),
                cipher.decrypt_signed(&d_key, &c).unwrap()
            );
        }
    }

    #[test]
    fn check_tiny_modulus_is_rejected() {
        let (cipher, _, _) = test_cipher();
        for n in [0u32, 1, 15] {
            let c = Ciphertext::from_parts(BigUint::from(5u32), BigUint::from(n));
            let bits = BigUint::from(n).bits();
            assert_eq!(
                cipher.refresh(&c).unwrap_err(),
                CryptoError::InvalidKeySize(bits)
            );

            let key = EncryptionKey::from_modulus(BigUint::from(n));
            assert_eq!(key.check().unwrap_err(), CryptoError::InvalidKeySize(bits));
            assert_eq!(
                cipher.encrypt(&key, &BigUint::zero()).unwrap_err(),
                CryptoError::InvalidKeySize(bits)
            );
        }
    }

    #[test]
    fn check_cross_key_is_rejected() {
        let (cipher, e_key, _) = test_cipher();
        let (_, other_e_key, other_d_key) = test_cipher();

        let c = cipher.encrypt_signed(&e_key, 5).unwrap();
        assert_eq!(
            cipher.decrypt(&other_d_key, &c).unwrap_err(),
            CryptoError::KeyMismatch
        );

        let other = cipher.encrypt_signed(&other_e_key, 5).unwrap();
        assert_eq!(
            cipher.homomorphic_add(&[c, other]).unwrap_err(),
            CryptoError::KeyMismatch
        );
    }

    #[test]
    fn check_malformed_ciphertext() {
        let (cipher, e_key, d_key) = test_cipher();

        let zero = Ciphertext::from_parts(BigUint::zero(), e_key.n.clone());
        assert!(matches!(
            cipher.decrypt(&d_key, &zero),
            Err(CryptoError::DecryptionFailure(_))
        ));

        let too_big = Ciphertext::from_parts(e_key.nn.clone(), e_key.n.clone());
        assert!(matches!(
            cipher.decrypt(&d_key, &too_big),
            Err(CryptoError::DecryptionFailure(_))
        ));

        let not_unit = Ciphertext::from_parts(e_key.n.clone(), e_key.n.clone());
        assert!(matches!(
            cipher.decrypt(&d_key, &not_unit),
            Err(CryptoError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn check_ciphertext_serde() {
        let (cipher, e_key, d_key) = test_cipher();
        let c = cipher.encrypt_signed(&e_key, -1234).unwrap();

        let json = serde_json::to_string(&c).unwrap();
        let restored: Ciphertext = serde_json::from_str(&json).unwrap();
        assert_eq!(
            cipher.decrypt_signed(&d_key, &restored).unwrap(),
            BigInt::from(-1234)
        );

        let key_json = serde_json::to_string(&e_key).unwrap();
        let restored_key: EncryptionKey = serde_json::from_str(&key_json).unwrap();
        assert_eq!(restored_key, e_key);
    }

    #[test]
    fn check_codec_helpers() {
        let n = BigUint::from(101u32);
        assert_eq!(encode_signed(-1, &n), BigUint::from(100u32));
        assert_eq!(encode_signed(0, &n), BigUint::zero());
        assert_eq!(decode_signed(&BigUint::from(100u32), &n), BigInt::from(-1));
        assert_eq!(decode_signed(&BigUint::from(50u32), &n), BigInt::from(50));
        assert_eq!(decode_signed(&BigUint::from(51u32), &n), BigInt::from(-50));
    }
}
