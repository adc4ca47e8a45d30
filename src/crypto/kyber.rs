// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kyber768 post-quantum key encapsulation mechanism (KEM), in its standardised ML-KEM-768 form.
//!
//! Encapsulation draws a fresh 32-byte secret towards a public key, only the holder of the
//! matching secret key can recover it from the ciphertext. Key generation and encapsulation take
//! their seeds from the injected [`Rng`], a failing generator surfaces as an error.
use std::fmt;

use ml_kem::kem::{Decapsulate, DecapsulationKey, EncapsulationKey};
use ml_kem::{
    B32, EncapsulateDeterministic, Encoded, EncodedSizeUser, KemCore, MlKem768, MlKem768Params,
};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::{Rng, RngError, Secret};

pub const PUBLIC_KEY_SIZE: usize = 1184;

pub const SECRET_KEY_SIZE: usize = 2400;

pub const CIPHERTEXT_SIZE: usize = 1088;

pub const SHARED_SECRET_SIZE: usize = 32;

type EncodedPublicKey = Encoded<EncapsulationKey<MlKem768Params>>;

type EncodedSecretKey = Encoded<DecapsulationKey<MlKem768Params>>;

type EncodedCiphertext = ml_kem::Ciphertext<MlKem768>;

/// Generates a fresh Kyber768 key pair from two 32-byte seeds drawn from `rng`.
pub fn generate_keypair(rng: &Rng) -> Result<(PublicKey, SecretKey), RngError> {
    let d = Secret::<32>::from_bytes(rng.random_array()?);
    let z = Secret::<32>::from_bytes(rng.random_array()?);
    let (decapsulation_key, encapsulation_key) =
        MlKem768::generate_deterministic(&B32::from(*d.as_bytes()), &B32::from(*z.as_bytes()));
    Ok((
        PublicKey(encapsulation_key.as_bytes().to_vec()),
        SecretKey(Zeroizing::new(decapsulation_key.as_bytes().to_vec())),
    ))
}

#[derive(Clone)]
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KyberError> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(KyberError::InvalidLength("secret key", bytes.len()));
        }
        Ok(Self(Zeroizing::new(bytes.to_vec())))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Recovers the encapsulated secret.
    ///
    /// Kyber uses implicit rejection: a ciphertext which was not produced for our public key
    /// yields an unrelated pseudo-random secret instead of an error.
    pub fn decapsulate(
        &self,
        ciphertext: &Ciphertext,
    ) -> Result<Secret<SHARED_SECRET_SIZE>, KyberError> {
        let encoded = EncodedSecretKey::try_from(self.as_bytes())
            .map_err(|_| KyberError::InvalidLength("secret key", self.0.len()))?;
        let decapsulation_key = DecapsulationKey::<MlKem768Params>::from_bytes(&encoded);
        let encoded_ciphertext = EncodedCiphertext::try_from(ciphertext.as_bytes())
            .map_err(|_| KyberError::InvalidLength("ciphertext", ciphertext.0.len()))?;
        let shared_secret = decapsulation_key
            .decapsulate(&encoded_ciphertext)
            .map_err(|_| KyberError::Decapsulation)?;
        shared_secret_from_slice(shared_secret.as_slice())
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.as_bytes().ct_eq(other.as_bytes()))
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&"***").finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KyberError> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(KyberError::InvalidLength("public key", bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encapsulates a fresh secret towards this public key, the 32-byte seed is drawn from `rng`.
    pub fn encapsulate(
        &self,
        rng: &Rng,
    ) -> Result<(Secret<SHARED_SECRET_SIZE>, Ciphertext), KyberError> {
        let encoded = EncodedPublicKey::try_from(self.as_bytes())
            .map_err(|_| KyberError::InvalidLength("public key", self.0.len()))?;
        let encapsulation_key = EncapsulationKey::<MlKem768Params>::from_bytes(&encoded);

        let m = Secret::<32>::from_bytes(rng.random_array()?);
        let (ciphertext, shared_secret) = encapsulation_key
            .encapsulate_deterministic(&B32::from(*m.as_bytes()))
            .map_err(|_| KyberError::Encapsulation)?;

        Ok((
            shared_secret_from_slice(shared_secret.as_slice())?,
            Ciphertext(ciphertext.to_vec()),
        ))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey")
            .field(&hex::encode(&self.as_bytes()[..8]))
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Ciphertext(Vec<u8>);

impl Ciphertext {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KyberError> {
        if bytes.len() != CIPHERTEXT_SIZE {
            return Err(KyberError::InvalidLength("ciphertext", bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ciphertext")
            .field(&format!("{} bytes", self.as_bytes().len()))
            .finish()
    }
}

fn shared_secret_from_slice(bytes: &[u8]) -> Result<Secret<SHARED_SECRET_SIZE>, KyberError> {
    let bytes: [u8; SHARED_SECRET_SIZE] = bytes
        .try_into()
        .map_err(|_| KyberError::InvalidLength("shared secret", bytes.len()))?;
    Ok(Secret::from_bytes(bytes))
}

#[derive(Debug, Error)]
pub enum KyberError {
    #[error("invalid kyber768 {0} length: {1} bytes")]
    InvalidLength(&'static str, usize),

    #[error("kyber768 encapsulation failed")]
    Encapsulation,

    #[error("kyber768 decapsulation failed")]
    Decapsulation,

    #[error(transparent)]
    Rng(#[from] RngError),
}

#[cfg(test)]
mod tests {
    use crate::crypto::{Rng, RngError};

    use super::{
        CIPHERTEXT_SIZE, Ciphertext, KyberError, PUBLIC_KEY_SIZE, PublicKey, SECRET_KEY_SIZE,
        SecretKey, generate_keypair,
    };

    #[test]
    fn encapsulate_decapsulate() {
        let rng = Rng::from_seed([1; 32]);
        let (public_key, secret_key) = generate_keypair(&rng).unwrap();

        let (secret, ciphertext) = public_key.encapsulate(&rng).unwrap();
        assert_eq!(ciphertext.as_bytes().len(), CIPHERTEXT_SIZE);

        let recovered = secret_key.decapsulate(&ciphertext).unwrap();
        assert_eq!(secret, recovered);
    }

    #[test]
    fn wrong_secret_key_recovers_different_secret() {
        let rng = Rng::from_seed([2; 32]);
        let (public_key, _) = generate_keypair(&rng).unwrap();
        let (_, other_secret_key) = generate_keypair(&rng).unwrap();

        let (secret, ciphertext) = public_key.encapsulate(&rng).unwrap();
        let recovered = other_secret_key.decapsulate(&ciphertext).unwrap();
        assert_ne!(secret, recovered);
    }

    #[test]
    fn keys_follow_the_seed() {
        let (public_key_1, secret_key_1) = generate_keypair(&Rng::from_seed([3; 32])).unwrap();
        let (public_key_2, secret_key_2) = generate_keypair(&Rng::from_seed([3; 32])).unwrap();
        assert_eq!(public_key_1, public_key_2);
        assert_eq!(secret_key_1, secret_key_2);
    }

    #[test]
    fn encoding_sizes() {
        let rng = Rng::from_seed([4; 32]);
        let (public_key, secret_key) = generate_keypair(&rng).unwrap();
        assert_eq!(public_key.as_bytes().len(), PUBLIC_KEY_SIZE);
        assert_eq!(secret_key.as_bytes().len(), SECRET_KEY_SIZE);

        assert_eq!(
            PublicKey::from_bytes(public_key.as_bytes()).unwrap(),
            public_key
        );
        assert_eq!(
            SecretKey::from_bytes(secret_key.as_bytes()).unwrap(),
            secret_key
        );
        assert!(matches!(
            Ciphertext::from_bytes(&[0; 12]),
            Err(KyberError::InvalidLength("ciphertext", 12))
        ));
    }

    #[test]
    fn failing_rng() {
        let rng = Rng::from_seed([5; 32]);
        let (public_key, _) = generate_keypair(&rng).unwrap();

        rng.poison();
        assert!(matches!(
            generate_keypair(&rng),
            Err(RngError::LockPoisoned)
        ));
        assert!(matches!(
            public_key.encapsulate(&rng),
            Err(KyberError::Rng(RngError::LockPoisoned))
        ));
    }
}
